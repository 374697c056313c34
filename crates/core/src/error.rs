//! Error types for the shopbot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each external collaborator has its own error enum; the pipeline never lets
//! one of these cross a component boundary; it converts them into a
//! [`Degradation`](crate::outcome::Degradation) with a fallback value instead.

use thiserror::Error;

/// The top-level error type for shopbot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Text / embedding generator errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Vector index errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Record lookup errors ---
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Operation not supported by {provider}: {operation}")]
    Unsupported { provider: String, operation: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Vector index request failed: {message} (status: {status_code})")]
    IndexError { status_code: u16, message: String },

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum RecordError {
    #[error("Record storage error: {0}")]
    Storage(String),

    #[error("Record query failed: {0}")]
    QueryFailed(String),

    #[error("Corrupted record: {0}")]
    Corrupted(String),
}

impl From<ProviderError> for RetrievalError {
    fn from(err: ProviderError) -> Self {
        RetrievalError::EmbeddingFailed(err.to_string())
    }
}
