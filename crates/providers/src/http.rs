//! Shared HTTP plumbing for the provider clients.

use shopbot_core::error::ProviderError;
use std::time::Duration;
use tracing::warn;

/// Build a client with a request timeout; falls back to reqwest defaults if
/// the TLS backend cannot be initialised with custom settings.
pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map a transport error, keeping timeouts distinguishable.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Turn non-success statuses into the matching [`ProviderError`].
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        return Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if !(200..300).contains(&status) {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::ApiError {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

/// Decode a JSON body.
pub(crate) async fn json_body(response: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))
}
