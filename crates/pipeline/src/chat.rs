//! The external-facing entry points: `process_chat` and the tenant context
//! helpers used by the instruction-and-context chat mode.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use shopbot_config::AppConfig;
use shopbot_core::records::FALLBACK_INTENT;
use shopbot_core::{
    BusinessId, CustomerId, Degradation, EmbeddingGenerator, IntentDefinition, Message, Modality, Outcome,
    RecordLookup, TextGenerator, VectorIndex,
};
use shopbot_retrieval::{ProductSearcher, SearchSettings};
use tracing::{info, warn};

use crate::context_cache::TenantContextCache;
use crate::orchestrator::GenerationOrchestrator;
use crate::router::IntentRouter;
use crate::strategies::{ContextStrategy, StrategyDeps, StrategyRegistry};

/// External collaborators the pipeline is built over.
#[derive(Clone)]
pub struct PipelineDeps {
    pub generator: Arc<dyn TextGenerator>,
    pub embedder: Arc<dyn EmbeddingGenerator>,
    pub index: Arc<dyn VectorIndex>,
    pub records: Arc<dyn RecordLookup>,
}

/// The reply to one customer message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub intent: String,
    pub confidence: f32,
    /// Every fallback taken while producing this reply
    #[serde(skip_serializing)]
    pub degradations: Vec<Degradation>,
}

impl ChatReply {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

pub struct ChatPipeline {
    records: Arc<dyn RecordLookup>,
    router: IntentRouter,
    registry: StrategyRegistry,
    strategy_deps: StrategyDeps,
    context_cache: Arc<TenantContextCache>,
    orchestrator: GenerationOrchestrator,
    instruction: String,
    context_ttl: Duration,
}

fn search_settings(config: &AppConfig) -> SearchSettings {
    let text_modalities = config
        .pipeline
        .text_search_modalities
        .iter()
        .filter_map(|m| m.parse::<Modality>().ok())
        .collect();
    SearchSettings {
        top_k: config.pipeline.search_top_k,
        top_n: config.pipeline.search_top_n,
        namespace_prefix: config.vector_index.namespace_prefix.clone(),
        text_modalities,
    }
}

/// Keep a degradation reason, if any.
fn note<T>(outcome: Outcome<T>, degradations: &mut Vec<Degradation>) -> T {
    match outcome {
        Outcome::Ok(value) => value,
        Outcome::Degraded { value, reason } => {
            degradations.push(reason);
            value
        }
    }
}

impl ChatPipeline {
    pub fn new(deps: PipelineDeps, config: &AppConfig) -> Self {
        let searcher = ProductSearcher::new(deps.embedder, deps.index, search_settings(config));
        Self {
            router: IntentRouter::new(deps.generator.clone(), config.pipeline.classifier_history_turns),
            registry: StrategyRegistry::new(),
            strategy_deps: StrategyDeps {
                records: deps.records.clone(),
                searcher: Arc::new(searcher),
            },
            context_cache: Arc::new(TenantContextCache::new()),
            orchestrator: GenerationOrchestrator::from_config(deps.generator, config),
            records: deps.records,
            instruction: config.pipeline.instruction().to_string(),
            context_ttl: Duration::from_secs(config.pipeline.context_cache_ttl_secs),
        }
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Share a tenant context cache with other pipelines.
    pub fn with_context_cache(mut self, cache: Arc<TenantContextCache>) -> Self {
        self.context_cache = cache;
        self
    }

    pub fn context_cache(&self) -> &Arc<TenantContextCache> {
        &self.context_cache
    }

    /// Route, assemble context and generate a reply. Always returns a reply.
    pub async fn process_chat(
        &self,
        message: &str,
        history: &[Message],
        customer_id: CustomerId,
        business_id: BusinessId,
    ) -> ChatReply {
        let started = Instant::now();
        let mut degradations = Vec::new();

        let intents = match self.records.get_enabled_intents(business_id).await {
            Ok(intents) => intents,
            Err(e) => {
                warn!(business_id, error = %e, "Intent lookup failed");
                degradations.push(Degradation::RecordLookup(e.to_string()));
                Vec::new()
            }
        };
        let lookup_ms = started.elapsed().as_millis() as u64;

        let classification = note(self.router.classify(message, history, &intents).await, &mut degradations);

        let context_started = Instant::now();
        let kind = self.registry.resolve(&classification.intent_type);
        let strategy = ContextStrategy::new(kind, business_id, customer_id)
            .with_template(template_for(&intents, &classification.intent_type));
        let context = note(
            strategy.build(&self.strategy_deps, message, history).await,
            &mut degradations,
        );
        let context_ms = context_started.elapsed().as_millis() as u64;

        let instruction = format!("{}\nIntent: {}", self.instruction, classification.intent_type);
        let reply = self.orchestrator.respond(message, history, &instruction, &context).await;

        let generation_failed = matches!(reply.reason(), Some(Degradation::Generation(_)));
        let response = note(reply, &mut degradations);

        let (intent, confidence) = if generation_failed {
            (FALLBACK_INTENT.to_string(), 0.0)
        } else {
            (classification.intent_type, classification.confidence)
        };

        info!(
            business_id,
            customer_id,
            intent = %intent,
            strategy = kind.intent_type(),
            degraded = degradations.len(),
            lookup_ms,
            context_ms,
            total_ms = started.elapsed().as_millis() as u64,
            "Chat processed"
        );

        ChatReply {
            response,
            intent,
            confidence,
            degradations,
        }
    }

    /// The tenant's rendered store facts and catalog.
    ///
    /// `use_cache = false`, or a zero configured TTL, always rebuilds.
    pub async fn get_tenant_context(&self, business_id: BusinessId, use_cache: bool) -> Outcome<String> {
        let ttl = if use_cache { self.context_ttl } else { Duration::ZERO };
        self.context_cache.get(business_id, ttl, self.records.as_ref()).await
    }

    /// Instruction-and-context mode: no routing, the whole tenant context is
    /// the static block.
    pub async fn chat_with_instruction(
        &self,
        message: &str,
        history: &[Message],
        business_id: BusinessId,
        instruction: Option<&str>,
        use_cache: bool,
    ) -> Outcome<String> {
        let context = self.get_tenant_context(business_id, use_cache).await;
        let instruction = instruction
            .filter(|i| !i.trim().is_empty())
            .unwrap_or(&self.instruction);

        let reply = self
            .orchestrator
            .respond(message, history, instruction, context.value())
            .await;

        match (reply, context.reason()) {
            (reply @ Outcome::Degraded { .. }, _) => reply,
            (Outcome::Ok(text), Some(reason)) => Outcome::degraded(text, reason.clone()),
            (ok, None) => ok,
        }
    }

    /// Drop cached tenant context for one tenant, or for all when `None`.
    pub async fn invalidate_tenant_context(&self, business_id: Option<BusinessId>) {
        match business_id {
            Some(id) => self.context_cache.invalidate(id).await,
            None => self.context_cache.invalidate_all().await,
        }
    }
}

fn template_for(intents: &[IntentDefinition], intent_type: &str) -> Option<String> {
    intents
        .iter()
        .find(|i| i.intent_type == intent_type)
        .and_then(|i| i.template.clone())
}
