//! Collaborator wiring: builds the configured generator, embedder and index.

use std::sync::Arc;
use std::time::Duration;

use shopbot_config::AppConfig;
use shopbot_core::error::ProviderError;
use shopbot_core::{EmbeddingGenerator, TextGenerator, VectorIndex};
use shopbot_retrieval::InMemoryVectorIndex;
use tracing::info;

use crate::gemini::GeminiGenerator;
use crate::openai_compat::{OpenAiCompatGenerator, OpenAiEmbedder};
use crate::pinecone::PineconeIndex;
use crate::vertex::VertexMultimodalEmbedder;

/// The external collaborators the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn TextGenerator>,
    pub embedder: Arc<dyn EmbeddingGenerator>,
    pub index: Arc<dyn VectorIndex>,
}

/// Build every collaborator from configuration.
pub fn build_from_config(config: &AppConfig) -> Result<Collaborators, ProviderError> {
    let collaborators = Collaborators {
        generator: build_generator(config)?,
        embedder: build_embedder(config)?,
        index: build_index(config)?,
    };
    info!(
        generator = collaborators.generator.name(),
        embedder = collaborators.embedder.name(),
        index = collaborators.index.name(),
        "Collaborators ready"
    );
    Ok(collaborators)
}

fn require(value: &Option<String>, what: &str) -> Result<String, ProviderError> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ProviderError::NotConfigured(what.to_string()))
}

fn build_generator(config: &AppConfig) -> Result<Arc<dyn TextGenerator>, ProviderError> {
    let cfg = &config.generator;
    let api_key = require(&cfg.api_key, "generator.api_key")?;
    let timeout = Duration::from_secs(cfg.timeout_secs);

    let generator: Arc<dyn TextGenerator> = match cfg.provider.as_str() {
        "gemini" => {
            let mut g = GeminiGenerator::new(api_key, &cfg.model).with_timeout(timeout);
            if let Some(base_url) = &cfg.base_url {
                g = g.with_base_url(base_url);
            }
            Arc::new(g)
        }
        name => {
            let base_url = cfg.base_url.clone().unwrap_or_else(|| default_base_url(name));
            Arc::new(OpenAiCompatGenerator::new(name, base_url, api_key, &cfg.model).with_timeout(timeout))
        }
    };
    Ok(generator)
}

fn build_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingGenerator>, ProviderError> {
    let cfg = &config.embedding;
    let api_key = require(&cfg.api_key, "embedding.api_key")?;

    let embedder: Arc<dyn EmbeddingGenerator> = match cfg.provider.as_str() {
        "vertex" => {
            let endpoint = require(&cfg.base_url, "embedding.base_url")?;
            Arc::new(VertexMultimodalEmbedder::new(endpoint, api_key, cfg.dimension))
        }
        name => {
            let base_url = cfg.base_url.clone().unwrap_or_else(|| default_base_url(name));
            Arc::new(OpenAiEmbedder::new(base_url, api_key, &cfg.model, cfg.dimension))
        }
    };
    Ok(embedder)
}

fn build_index(config: &AppConfig) -> Result<Arc<dyn VectorIndex>, ProviderError> {
    let cfg = &config.vector_index;
    let index: Arc<dyn VectorIndex> = match cfg.backend.as_str() {
        "memory" => Arc::new(InMemoryVectorIndex::new(cfg.dimension)),
        "pinecone" => {
            let api_key = require(&cfg.api_key, "vector_index.api_key")?;
            let host = require(&cfg.host, "vector_index.host")?;
            Arc::new(PineconeIndex::new(&host, api_key, cfg.dimension))
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "unknown vector index backend: {other}"
            )));
        }
    };
    Ok(index)
}

/// Get the default base URL for well-known OpenAI-compatible providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.generator.api_key = Some("g-key".into());
        config.embedding.api_key = Some("o-key".into());
        config.vector_index.api_key = Some("p-key".into());
        config.vector_index.host = Some("idx.svc.pinecone.io".into());
        config
    }

    #[test]
    fn builds_default_stack() {
        let collaborators = build_from_config(&configured()).unwrap();
        assert_eq!(collaborators.generator.name(), "gemini");
        assert!(collaborators.generator.supports_prefix_cache());
        assert_eq!(collaborators.embedder.name(), "openai");
        assert_eq!(collaborators.index.name(), "pinecone");
    }

    #[test]
    fn missing_generator_key_is_not_configured() {
        let mut config = configured();
        config.generator.api_key = None;
        assert!(matches!(
            build_from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn openai_generator_and_memory_index() {
        let mut config = configured();
        config.generator.provider = "openai".into();
        config.vector_index.backend = "memory".into();
        config.vector_index.host = None;
        let collaborators = build_from_config(&config).unwrap();
        assert_eq!(collaborators.generator.name(), "openai");
        assert!(!collaborators.generator.supports_prefix_cache());
        assert_eq!(collaborators.index.name(), "in_memory");
    }

    #[test]
    fn vertex_needs_endpoint() {
        let mut config = configured();
        config.embedding.provider = "vertex".into();
        assert!(build_from_config(&config).is_err());

        config.embedding.base_url = Some("http://localhost/predict".into());
        let collaborators = build_from_config(&config).unwrap();
        assert_eq!(collaborators.embedder.name(), "vertex");
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = configured();
        config.vector_index.backend = "faiss".into();
        assert!(build_from_config(&config).is_err());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }
}
