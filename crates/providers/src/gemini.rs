//! Gemini text generator.
//!
//! Uses the Generative Language REST API:
//! - `POST {base}/models/{model}:generateContent?key=API_KEY`
//! - `POST {base}/cachedContents?key=API_KEY` to cache a prompt prefix; the
//!   returned `name` is passed back as `cachedContent` on later calls.

use async_trait::async_trait;
use serde_json::{Value, json};
use shopbot_core::error::ProviderError;
use shopbot_core::provider::*;
use std::time::Duration;
use tracing::{debug, info};

use crate::http;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A Gemini model behind the Generative Language API.
pub struct GeminiGenerator {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: http::client(Duration::from_secs(60)),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn user_contents(text: &str) -> Value {
        json!([{ "role": "user", "parts": [{ "text": text }] }])
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut generation_config = json!({ "temperature": request.temperature });
        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }

        let mut body = json!({
            "contents": Self::user_contents(&request.prompt),
            "generationConfig": generation_config,
        });
        if let Some(prefix) = &request.cached_prefix {
            body["cachedContent"] = json!(prefix.handle);
        }
        body
    }
}

/// Extract text and usage from a `generateContent` response body.
pub(crate) fn parse_generate_response(body: &Value, model: &str) -> Result<GenerationResponse, ProviderError> {
    let candidate = body["candidates"]
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| ProviderError::MalformedResponse("Missing 'candidates' in response".into()))?;

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        return Err(ProviderError::MalformedResponse(format!(
            "Empty candidate (finishReason: {reason})"
        )));
    }

    let meta = &body["usageMetadata"];
    let usage = meta.is_object().then(|| Usage {
        prompt_tokens: meta["promptTokenCount"].as_u64().unwrap_or(0) as u32,
        completion_tokens: meta["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
        total_tokens: meta["totalTokenCount"].as_u64().unwrap_or(0) as u32,
        cached_tokens: meta["cachedContentTokenCount"].as_u64().unwrap_or(0) as u32,
    });

    Ok(GenerationResponse {
        text,
        usage,
        model: body["modelVersion"].as_str().unwrap_or(model).to_string(),
    })
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.request_body(&request);

        debug!(
            model = %self.model,
            cached_prefix = request.cached_prefix.is_some(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(self.name(), response).await?;
        let body = http::json_body(response).await?;
        parse_generate_response(&body, &self.model)
    }

    fn supports_prefix_cache(&self) -> bool {
        true
    }

    async fn create_cached_prefix(&self, request: PrefixCacheRequest) -> Result<CachedPrefix, ProviderError> {
        let url = format!("{}/cachedContents", self.base_url);
        let body = json!({
            "model": format!("models/{}", self.model),
            "contents": Self::user_contents(&request.content),
            "ttl": format!("{}s", request.ttl.as_secs()),
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(self.name(), response).await?;
        let body = http::json_body(response).await?;
        let handle = body["name"]
            .as_str()
            .ok_or_else(|| ProviderError::MalformedResponse("cachedContents response has no name".into()))?
            .to_string();

        info!(model = %self.model, handle = %handle, ttl_secs = request.ttl.as_secs(), "Created cached prompt prefix");
        Ok(CachedPrefix {
            handle,
            ttl: request.ttl,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        let response = self
            .client
            .get(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(http::transport_error)?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_cached_content_handle() {
        let generator = GeminiGenerator::new("key", "gemini-2.5-flash");
        let request = GenerationRequest::new("suffix", 0.0).with_cached_prefix(CachedPrefix {
            handle: "cachedContents/abc".into(),
            ttl: Duration::from_secs(60),
        });
        let body = generator.request_body(&request);
        assert_eq!(body["cachedContent"], "cachedContents/abc");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "suffix");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn body_without_prefix_has_no_cached_content() {
        let generator = GeminiGenerator::new("key", "gemini-2.5-flash");
        let body = generator.request_body(&GenerationRequest::new("full", 0.0).with_max_tokens(256));
        assert!(body.get("cachedContent").is_none());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }

    #[test]
    fn parses_text_and_usage() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Dạ " }, { "text": "chào bạn" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 100,
                "candidatesTokenCount": 5,
                "totalTokenCount": 105,
                "cachedContentTokenCount": 80
            }
        });
        let response = parse_generate_response(&body, "gemini-2.5-flash").unwrap();
        assert_eq!(response.text, "Dạ chào bạn");
        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 105);
        assert_eq!(usage.cached_tokens, 80);
        assert_eq!(response.model, "gemini-2.5-flash");
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let err = parse_generate_response(&json!({ "usageMetadata": {} }), "m").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn blocked_candidate_is_malformed() {
        let body = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let err = parse_generate_response(&body, "m").unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let generator = GeminiGenerator::new("key", "m").with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(generator.base_url, "http://localhost:9000/v1beta");
        assert!(generator.supports_prefix_cache());
    }
}
