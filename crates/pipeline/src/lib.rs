//! The shopbot response pipeline.
//!
//! For every inbound customer message:
//!
//! 1. **Route**: classify the message against the tenant's enabled intents
//! 2. **Assemble**: run the context strategy registered for that intent
//! 3. **Generate**: compose instruction, context, history and message,
//!    reusing a server-side cached prompt prefix when the generator has one
//! 4. **Guard**: replace replies that fail the language check
//!
//! Every step has a documented fallback, so [`ChatPipeline::process_chat`]
//! always returns a reply.

pub mod chat;
pub mod context_cache;
pub mod format;
pub mod guardrail;
pub mod orchestrator;
pub mod prompt_cache;
pub mod router;
pub mod strategies;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chat::{ChatPipeline, ChatReply, PipelineDeps};
pub use context_cache::{TenantContext, TenantContextCache, render_static_context};
pub use guardrail::LanguageGuardrail;
pub use orchestrator::GenerationOrchestrator;
pub use prompt_cache::{PromptCache, PromptCacheEntry, cache_key};
pub use router::IntentRouter;
pub use strategies::{ContextStrategy, StrategyDeps, StrategyKind, StrategyRegistry};
