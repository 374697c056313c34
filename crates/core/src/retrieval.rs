//! Vector retrieval types and the [`VectorIndex`] trait.
//!
//! Catalog entries are indexed as several vectors each (one text vector and
//! one per image), with ids of the form `{entity_id}_{suffix}`. Hits are
//! ephemeral; the merge/rank engine projects them onto entity identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// Metadata key holding a vector's modality.
pub const MODALITY_KEY: &str = "vector_type";

/// Which kind of content a vector was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
        }
    }

    /// Infer modality from a vector id suffix (`_image_main`, `_image_3`, `_text`).
    pub fn from_vector_id(vector_id: &str) -> Self {
        match vector_id.split_once('_') {
            Some((_, suffix)) if suffix.starts_with("image") => Modality::Image,
            _ => Modality::Text,
        }
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Modality::Text),
            "image" => Ok(Modality::Image),
            other => Err(format!("unknown modality: {other}")),
        }
    }
}

/// One raw nearest-neighbour match from the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub vector_id: String,
    pub score: f32,
    pub modality: Modality,
    #[serde(default)]
    pub raw_metadata: serde_json::Map<String, serde_json::Value>,
}

impl RetrievalHit {
    pub fn new(vector_id: impl Into<String>, score: f32) -> Self {
        let vector_id = vector_id.into();
        Self {
            modality: Modality::from_vector_id(&vector_id),
            vector_id,
            score,
            raw_metadata: serde_json::Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        self.raw_metadata.insert(key.to_string(), value);
        self
    }
}

/// A deduplicated search result for one logical catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    pub entity_id: i64,
    /// Maximum score across every hit that resolved to this entity
    pub best_score: f32,
    pub modality_of_best_hit: Modality,
    /// Metadata of the best-scoring hit
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RankedEntity {
    /// Entity display name from metadata.
    pub fn name(&self) -> Option<&str> {
        self.metadata.get("name").and_then(|v| v.as_str())
    }

    /// Entity price from metadata (numeric or numeric string).
    pub fn price(&self) -> Option<f64> {
        match self.metadata.get("price")? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A similarity query against one namespace.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub namespace: String,
    pub top_k: usize,
    /// Restrict to vectors of one modality
    pub modality: Option<Modality>,
    /// Exact-match metadata filters (scalars match with `$eq`, arrays with `$in`)
    pub filter: serde_json::Map<String, serde_json::Value>,
}

/// A vector to write to the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Nearest-neighbour index keyed by vector id within a namespace.
///
/// Implementations: Pinecone, in-memory (cosine).
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    async fn query(&self, query: VectorQuery) -> std::result::Result<Vec<RetrievalHit>, RetrievalError>;

    async fn upsert(
        &self,
        namespace: &str,
        records: Vec<VectorRecord>,
    ) -> std::result::Result<usize, RetrievalError>;

    async fn delete(&self, namespace: &str, ids: &[String]) -> std::result::Result<(), RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modality_from_vector_id_suffix() {
        assert_eq!(Modality::from_vector_id("42_text"), Modality::Text);
        assert_eq!(Modality::from_vector_id("42_image_main"), Modality::Image);
        assert_eq!(Modality::from_vector_id("42_image_3"), Modality::Image);
        assert_eq!(Modality::from_vector_id("42"), Modality::Text);
    }

    #[test]
    fn modality_parses_case_insensitively() {
        assert_eq!("IMAGE".parse::<Modality>().unwrap(), Modality::Image);
        assert!("audio".parse::<Modality>().is_err());
    }

    #[test]
    fn ranked_entity_reads_price_from_string_or_number() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("name".into(), serde_json::json!("Áo thun"));
        metadata.insert("price".into(), serde_json::json!("250000"));
        let entity = RankedEntity {
            entity_id: 10,
            best_score: 0.9,
            modality_of_best_hit: Modality::Text,
            metadata,
        };
        assert_eq!(entity.name(), Some("Áo thun"));
        assert_eq!(entity.price(), Some(250000.0));
    }
}
