//! OpenAI-compatible text generator and text embedder.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! endpoint exposing `/chat/completions` and `/embeddings`. These endpoints
//! have no server-side prompt-prefix cache, so the generator keeps the
//! trait's default (unsupported).

use async_trait::async_trait;
use serde::Deserialize;
use shopbot_core::error::ProviderError;
use shopbot_core::provider::*;
use std::time::Duration;
use tracing::debug;

use crate::http;

/// An OpenAI-compatible chat model used as a plain text generator.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client: http::client(Duration::from_secs(120)),
        }
    }

    /// Create an OpenAI generator (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http::client(timeout);
        self
    }

    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        if request.cached_prefix.is_some() {
            return Err(ProviderError::Unsupported {
                provider: self.name.clone(),
                operation: "cached prefix generation".into(),
            });
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(provider = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(&self.name, response).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        api_response.into_generation()
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(http::transport_error)?;

        Ok(response.status().is_success())
    }
}

/// A text-only embedder behind an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
            client: http::client(Duration::from_secs(30)),
        }
    }

    pub fn openai(api_key: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self::new("https://api.openai.com/v1", api_key, model, dimension)
    }
}

#[async_trait]
impl EmbeddingGenerator for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "encoding_format": "float",
        });

        debug!(model = %self.model, chars = text.chars().count(), "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status("openai", response).await?;
        let api_resp: EmbeddingApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse embedding response: {e}")))?;

        let embedding = api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::MalformedResponse("No embedding in response".into()))?;

        if embedding.len() != self.dimension {
            return Err(ProviderError::MalformedResponse(format!(
                "Expected {}-dimensional embedding, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

impl ApiResponse {
    fn into_generation(self) -> Result<GenerationResponse, ProviderError> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("No choices in response".into()))?;

        Ok(GenerationResponse {
            text: content,
            usage: self.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
                cached_tokens: 0,
            }),
            model: self.model,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_constructor() {
        let generator = OpenAiCompatGenerator::openai("sk-test", "gpt-4o-mini");
        assert_eq!(generator.name(), "openai");
        assert_eq!(generator.base_url, "https://api.openai.com/v1");
        assert!(!generator.supports_prefix_cache());
    }

    #[test]
    fn request_body_is_single_user_message() {
        let generator = OpenAiCompatGenerator::new("local", "http://localhost:11434/v1/", "x", "qwen");
        let body = generator.request_body(&GenerationRequest::new("Xin chào", 0.0));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Xin chào");
        assert_eq!(generator.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn parse_completion_response() {
        let json = r#"{
            "model": "gpt-4o-mini",
            "choices": [{"message": {"role": "assistant", "content": "Dạ vâng ạ"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        let generation = resp.into_generation().unwrap();
        assert_eq!(generation.text, "Dạ vâng ạ");
        assert_eq!(generation.usage.unwrap().total_tokens, 16);
    }

    #[test]
    fn empty_choices_is_malformed() {
        let resp: ApiResponse = serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(matches!(resp.into_generation(), Err(ProviderError::MalformedResponse(_))));
    }

    #[test]
    fn parse_embedding_response() {
        let json = r#"{"data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}], "model": "text-embedding-3-small"}"#;
        let resp: EmbeddingApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].embedding.len(), 3);
    }

    #[tokio::test]
    async fn cached_prefix_requests_are_rejected() {
        let generator = OpenAiCompatGenerator::openai("sk-test", "gpt-4o-mini");
        let request = GenerationRequest::new("suffix", 0.0).with_cached_prefix(CachedPrefix {
            handle: "h".into(),
            ttl: Duration::from_secs(1),
        });
        let err = generator.complete(request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn image_embedding_is_absent() {
        let embedder = OpenAiEmbedder::openai("sk-test", "text-embedding-3-small", 1536);
        assert_eq!(embedder.dimension(), 1536);
        assert!(embedder.embed_image("https://example.com/a.jpg").await.is_none());
    }
}
