//! Generation call orchestrator.
//!
//! Composes the final prompt from four labelled sections in a fixed order:
//!
//! ```text
//! INSTRUCTION:   ┐ prefix, cacheable server-side
//! CONTEXT:       ┘
//! HISTORY:       ┐ suffix, sent on every call
//! CUSTOMER:      ┘
//! ```
//!
//! When the generator can cache prefixes, the prefix is registered once per
//! distinct (instruction, context) pair and later calls send only the
//! suffix. Every cache failure falls through to a full-prompt call, and a
//! failed full-prompt call yields the support apology.

use std::sync::Arc;
use std::time::{Duration, Instant};

use shopbot_config::AppConfig;
use shopbot_core::error::ProviderError;
use shopbot_core::{
    CachedPrefix, Degradation, GenerationRequest, Message, Outcome, PrefixCacheRequest, TextGenerator, recent,
    transcript,
};
use tracing::{info, warn};

use crate::guardrail::LanguageGuardrail;
use crate::prompt_cache::{PromptCache, cache_key};

const EMPTY_HISTORY: &str = "(chưa có)";

/// Which path produced the raw reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CacheState {
    Hit,
    Miss,
    Unavailable,
}

impl CacheState {
    fn as_str(&self) -> &'static str {
        match self {
            CacheState::Hit => "hit",
            CacheState::Miss => "miss",
            CacheState::Unavailable => "unavailable",
        }
    }
}

pub struct GenerationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<PromptCache>,
    guardrail: LanguageGuardrail,
    apology: String,
    history_turns: usize,
    temperature: f32,
    prefix_cache_enabled: bool,
    prefix_ttl: Duration,
}

impl GenerationOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, guardrail: LanguageGuardrail, apology: impl Into<String>) -> Self {
        Self {
            generator,
            cache: Arc::new(PromptCache::new()),
            guardrail,
            apology: apology.into(),
            history_turns: 6,
            temperature: 0.0,
            prefix_cache_enabled: true,
            prefix_ttl: Duration::from_secs(3600),
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &AppConfig) -> Self {
        Self::new(
            generator,
            LanguageGuardrail::from_config(&config.guardrail),
            config.support.apology(),
        )
        .with_history_turns(config.pipeline.generation_history_turns)
        .with_temperature(config.pipeline.temperature)
        .with_prefix_cache(
            config.pipeline.prompt_cache_enabled,
            Duration::from_secs(config.pipeline.prompt_cache_ttl_secs),
        )
    }

    /// Share a prompt cache across orchestrators.
    pub fn with_cache(mut self, cache: Arc<PromptCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_prefix_cache(mut self, enabled: bool, ttl: Duration) -> Self {
        self.prefix_cache_enabled = enabled;
        self.prefix_ttl = ttl;
        self
    }

    pub fn apology(&self) -> &str {
        &self.apology
    }

    pub fn cache(&self) -> &Arc<PromptCache> {
        &self.cache
    }

    /// Produce the customer-facing reply. Never fails.
    pub async fn respond(
        &self,
        message: &str,
        history: &[Message],
        instruction: &str,
        static_context: &str,
    ) -> Outcome<String> {
        let started = Instant::now();
        let prefix = compose_prefix(instruction, static_context);
        let suffix = self.compose_suffix(message, history);

        let (state, raw) = self.raw_reply(instruction, static_context, &prefix, &suffix).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match raw {
            Ok(text) => {
                info!(
                    generator = self.generator.name(),
                    prompt_cache = state.as_str(),
                    elapsed_ms,
                    "Reply generated"
                );
                self.guardrail.check(&text)
            }
            Err(e) => {
                warn!(
                    generator = self.generator.name(),
                    prompt_cache = state.as_str(),
                    error = %e,
                    elapsed_ms,
                    "Generation failed, sending apology"
                );
                Outcome::degraded(self.apology.clone(), Degradation::Generation(e.to_string()))
            }
        }
    }

    async fn raw_reply(
        &self,
        instruction: &str,
        static_context: &str,
        prefix: &str,
        suffix: &str,
    ) -> (CacheState, Result<String, ProviderError>) {
        if self.prefix_cache_enabled && self.generator.supports_prefix_cache() {
            let key = cache_key(instruction, static_context);

            match self.cache.get_live(&key).await {
                Some(entry) => match self.submit_suffix(entry.prefix, suffix).await {
                    Ok(text) => return (CacheState::Hit, Ok(text)),
                    Err(e) => {
                        warn!(error = %e, "Cached prefix call failed, using full prompt");
                        self.cache.evict(&key).await;
                    }
                },
                None => {
                    let request = PrefixCacheRequest {
                        content: prefix.to_string(),
                        ttl: self.prefix_ttl,
                    };
                    match self.generator.create_cached_prefix(request).await {
                        Ok(created) => {
                            self.cache.insert(&key, created.clone()).await;
                            match self.submit_suffix(created, suffix).await {
                                Ok(text) => return (CacheState::Miss, Ok(text)),
                                Err(e) => {
                                    warn!(error = %e, "Fresh prefix call failed, using full prompt");
                                    self.cache.evict(&key).await;
                                }
                            }
                        }
                        Err(e) => warn!(error = %e, "Prefix cache creation failed, using full prompt"),
                    }
                }
            }
        }

        let full = format!("{prefix}\n\n{suffix}");
        let result = self
            .generator
            .complete(GenerationRequest::new(full, self.temperature))
            .await
            .map(|r| r.text);
        (CacheState::Unavailable, result)
    }

    async fn submit_suffix(&self, prefix: CachedPrefix, suffix: &str) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(suffix, self.temperature).with_cached_prefix(prefix);
        self.generator.complete(request).await.map(|r| r.text)
    }

    fn compose_suffix(&self, message: &str, history: &[Message]) -> String {
        let window = recent(history, self.history_turns);
        let history_text = if window.is_empty() {
            EMPTY_HISTORY.to_string()
        } else {
            transcript(window)
        };
        format!("HISTORY:\n{history_text}\n\nCUSTOMER:\n{message}")
    }
}

fn compose_prefix(instruction: &str, static_context: &str) -> String {
    format!("INSTRUCTION:\n{instruction}\n\nCONTEXT:\n{static_context}")
}
