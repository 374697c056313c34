//! # Shopbot Core
//!
//! Domain types, collaborator traits, and error definitions for the shopbot
//! retrieval-augmented response pipeline. This crate has **no I/O**; it
//! defines the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (record store, embedding generator, vector
//! index, text generator) is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Testing the pipeline with scripted stand-ins
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod outcome;
pub mod provider;
pub mod records;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, RecordError, Result, RetrievalError};
pub use message::{Message, Role, recent, transcript};
pub use outcome::{Degradation, Outcome};
pub use provider::{
    CachedPrefix, EmbeddingGenerator, GenerationRequest, GenerationResponse, PrefixCacheRequest,
    TextGenerator, Usage,
};
pub use records::{
    BusinessId, CatalogEntry, ClassificationResult, CustomerId, IntentDefinition, IntentStatus,
    RecordLookup, TenantRecord,
};
pub use retrieval::{Modality, RankedEntity, RetrievalHit, VectorIndex, VectorQuery, VectorRecord};
