//! Retrieval for shopbot.
//!
//! - [`rank`]: the pure merge/rank engine that projects raw vector hits onto
//!   catalog entity identity
//! - [`search`]: multi-modal product search (embed, query per modality, rank)
//! - [`in_memory`]: a cosine-similarity [`VectorIndex`](shopbot_core::VectorIndex)
//!   for tests and offline runs

pub mod in_memory;
pub mod rank;
pub mod search;
pub mod vector;

pub use in_memory::InMemoryVectorIndex;
pub use rank::{extract_entity_id, merge_and_rank};
pub use search::{ProductSearcher, SearchSettings};
