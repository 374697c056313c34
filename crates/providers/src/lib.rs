//! External collaborator clients for shopbot.
//!
//! Text generators implement `shopbot_core::TextGenerator`, embedders
//! implement `shopbot_core::EmbeddingGenerator` and vector indexes implement
//! `shopbot_core::VectorIndex`. [`build_from_config`] wires the configured
//! set together.

pub mod gemini;
mod http;
pub mod openai_compat;
pub mod pinecone;
pub mod router;
pub mod vertex;

pub use gemini::GeminiGenerator;
pub use openai_compat::{OpenAiCompatGenerator, OpenAiEmbedder};
pub use pinecone::PineconeIndex;
pub use router::{Collaborators, build_from_config};
pub use vertex::VertexMultimodalEmbedder;
