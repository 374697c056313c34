//! Generator traits: the abstraction over LLM and embedding backends.
//!
//! A [`TextGenerator`] turns a prompt into text, optionally against a
//! server-side cached prompt prefix. An [`EmbeddingGenerator`] turns text or
//! an image URL into a fixed-dimension vector.
//!
//! Implementations: Gemini, OpenAI-compatible endpoints, Vertex multimodal.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ProviderError;

/// A single text generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The prompt. When `cached_prefix` is set this is only the dynamic suffix.
    pub prompt: String,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Server-side cached prefix to prepend to `prompt`
    pub cached_prefix: Option<CachedPrefix>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            temperature,
            max_tokens: None,
            cached_prefix: None,
        }
    }

    pub fn with_cached_prefix(mut self, prefix: CachedPrefix) -> Self {
        self.cached_prefix = Some(prefix);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A complete response from a text generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Tokens served from a cached prefix, when the provider reports it
    #[serde(default)]
    pub cached_tokens: u32,
}

/// A request to cache a prompt prefix server-side.
#[derive(Debug, Clone)]
pub struct PrefixCacheRequest {
    /// The prefix content (instruction + static context)
    pub content: String,

    /// How long the provider should keep it
    pub ttl: Duration,
}

/// An opaque handle to a server-side cached prompt prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPrefix {
    /// Provider-specific reference (e.g. Gemini `cachedContents/abc123`)
    pub handle: String,

    /// The TTL the provider accepted
    pub ttl: Duration,
}

/// The core text generation trait.
///
/// The pipeline calls `complete()` without knowing which backend is in use.
/// Prefix caching is an optional capability: callers check
/// `supports_prefix_cache()` and must work correctly when it is absent.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name for this generator (e.g., "gemini", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError>;

    /// Whether `create_cached_prefix` can succeed at all.
    fn supports_prefix_cache(&self) -> bool {
        false
    }

    /// Cache a prompt prefix server-side and return its handle.
    ///
    /// Default implementation reports the operation as unsupported.
    async fn create_cached_prefix(
        &self,
        _request: PrefixCacheRequest,
    ) -> std::result::Result<CachedPrefix, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name().to_string(),
            operation: "create_cached_prefix".into(),
        })
    }

    /// Health check: can we reach the generator?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

/// Turns text or images into vectors in one shared embedding space.
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// A human-readable name for this embedder.
    fn name(&self) -> &str;

    /// The dimension of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Embed a text query.
    async fn embed_text(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError>;

    /// Embed the image at `url`. Failures are absorbed: `None` means the
    /// image could not be fetched or embedded.
    async fn embed_image(&self, _url: &str) -> Option<Vec<f32>> {
        None
    }
}
