//! In-memory vector index, used for testing and offline runs.

use async_trait::async_trait;
use serde_json::Value;
use shopbot_core::error::RetrievalError;
use shopbot_core::retrieval::MODALITY_KEY;
use shopbot_core::{Modality, RetrievalHit, VectorIndex, VectorQuery, VectorRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::vector::cosine_similarity;

/// A cosine-similarity index holding every namespace in a map.
pub struct InMemoryVectorIndex {
    dimension: usize,
    namespaces: Arc<RwLock<HashMap<String, Vec<VectorRecord>>>>,
}

impl InMemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            namespaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of vectors stored in `namespace`.
    pub async fn count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, Vec::len)
    }

    fn check_dimension(&self, actual: usize) -> Result<(), RetrievalError> {
        if actual != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

fn record_modality(record: &VectorRecord) -> Modality {
    record
        .metadata
        .get(MODALITY_KEY)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| Modality::from_vector_id(&record.id))
}

/// Scalars match by equality, arrays by membership.
fn matches_filter(record: &VectorRecord, filter: &serde_json::Map<String, Value>) -> bool {
    filter.iter().all(|(key, expected)| {
        let Some(actual) = record.metadata.get(key) else {
            return false;
        };
        match expected {
            Value::Array(options) => options.contains(actual),
            scalar => scalar == actual,
        }
    })
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, query: VectorQuery) -> Result<Vec<RetrievalHit>, RetrievalError> {
        self.check_dimension(query.vector.len())?;

        let namespaces = self.namespaces.read().await;
        let Some(records) = namespaces.get(&query.namespace) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<RetrievalHit> = records
            .iter()
            .filter(|r| query.modality.is_none_or(|m| record_modality(r) == m))
            .filter(|r| matches_filter(r, &query.filter))
            .map(|r| RetrievalHit {
                vector_id: r.id.clone(),
                score: cosine_similarity(&r.values, &query.vector),
                modality: record_modality(r),
                raw_metadata: r.metadata.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(query.top_k);
        Ok(hits)
    }

    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, RetrievalError> {
        for record in &records {
            self.check_dimension(record.values.len())?;
        }

        let count = records.len();
        let mut namespaces = self.namespaces.write().await;
        let stored = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record);
        }
        Ok(count)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), RetrievalError> {
        if let Some(stored) = self.namespaces.write().await.get_mut(namespace) {
            stored.retain(|r| !ids.contains(&r.id));
        }
        Ok(())
    }
}
