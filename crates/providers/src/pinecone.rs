//! Pinecone vector index client (data-plane REST API).
//!
//! - `POST https://{host}/query`
//! - `POST https://{host}/vectors/upsert`
//! - `POST https://{host}/vectors/delete`
//!
//! Authenticated with the `Api-Key` header. Metadata values must be scalars
//! or lists of strings; everything else is coerced before upsert.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use shopbot_core::error::{ProviderError, RetrievalError};
use shopbot_core::records::value_text;
use shopbot_core::retrieval::MODALITY_KEY;
use shopbot_core::{Modality, RetrievalHit, VectorIndex, VectorQuery, VectorRecord};
use std::time::Duration;
use tracing::{debug, info};

use crate::http;

/// Vectors sent per upsert request.
const UPSERT_BATCH: usize = 100;

pub struct PineconeIndex {
    base_url: String,
    api_key: String,
    dimension: usize,
    client: reqwest::Client,
}

impl PineconeIndex {
    /// `host` may be given with or without scheme.
    pub fn new(host: &str, api_key: impl Into<String>, dimension: usize) -> Self {
        let host = host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        Self {
            base_url,
            api_key: api_key.into(),
            dimension,
            client: http::client(Duration::from_secs(30)),
        }
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

    async fn post(&self, path: &str, body: &Value) -> Result<Value, RetrievalError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RetrievalError::Network(e.to_string()))?;

        let response = http::check_status("pinecone", response)
            .await
            .map_err(index_error)?;
        http::json_body(response).await.map_err(index_error)
    }
}

fn index_error(e: ProviderError) -> RetrievalError {
    match e {
        ProviderError::ApiError { status_code, message } => RetrievalError::IndexError { status_code, message },
        ProviderError::RateLimited { .. } => RetrievalError::IndexError {
            status_code: 429,
            message: "rate limited".into(),
        },
        ProviderError::AuthenticationFailed(message) => RetrievalError::IndexError {
            status_code: 401,
            message,
        },
        other => RetrievalError::Network(other.to_string()),
    }
}

/// Translate exact-match filters into Pinecone's operator syntax.
pub(crate) fn translate_filter(filter: &Map<String, Value>, modality: Option<Modality>) -> Option<Value> {
    let mut clauses = Map::new();
    for (key, value) in filter {
        let clause = match value {
            Value::Array(options) => json!({ "$in": options }),
            scalar => json!({ "$eq": scalar }),
        };
        clauses.insert(key.clone(), clause);
    }
    if let Some(modality) = modality {
        clauses.insert(MODALITY_KEY.into(), json!({ "$eq": modality.as_str() }));
    }
    (!clauses.is_empty()).then_some(Value::Object(clauses))
}

/// Coerce metadata into the value types Pinecone accepts.
pub(crate) fn sanitize_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    metadata
        .iter()
        .filter_map(|(key, value)| {
            let clean = match value {
                Value::Null => return None,
                Value::String(_) | Value::Number(_) | Value::Bool(_) => value.clone(),
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .filter(|v| !v.is_null())
                        .map(|v| Value::String(value_text(v)))
                        .collect(),
                ),
                Value::Object(_) => Value::String(value.to_string()),
            };
            Some((key.clone(), clean))
        })
        .collect()
}

pub(crate) fn parse_matches(body: &Value) -> Vec<RetrievalHit> {
    body["matches"]
        .as_array()
        .map(|matches| {
            matches
                .iter()
                .filter_map(|m| {
                    let id = m["id"].as_str()?;
                    let score = m["score"].as_f64().unwrap_or(0.0) as f32;
                    let metadata = m["metadata"].as_object().cloned().unwrap_or_default();
                    let modality = metadata
                        .get(MODALITY_KEY)
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| Modality::from_vector_id(id));
                    Some(RetrievalHit {
                        vector_id: id.to_string(),
                        score,
                        modality,
                        raw_metadata: metadata,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn query(&self, query: VectorQuery) -> Result<Vec<RetrievalHit>, RetrievalError> {
        self.check_dimension(query.vector.len())?;

        let mut body = json!({
            "vector": query.vector,
            "topK": query.top_k,
            "namespace": query.namespace,
            "includeMetadata": true,
        });
        if let Some(filter) = translate_filter(&query.filter, query.modality) {
            body["filter"] = filter;
        }

        debug!(namespace = %query.namespace, top_k = query.top_k, "Querying Pinecone");
        let response = self.post("/query", &body).await?;
        Ok(parse_matches(&response))
    }

    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<usize, RetrievalError> {
        for record in &records {
            self.check_dimension(record.values.len())?;
        }

        let mut upserted = 0usize;
        for batch in records.chunks(UPSERT_BATCH) {
            let vectors: Vec<Value> = batch
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "values": r.values,
                        "metadata": sanitize_metadata(&r.metadata),
                    })
                })
                .collect();
            let body = json!({ "vectors": vectors, "namespace": namespace });
            let response = self.post("/vectors/upsert", &body).await?;
            upserted += response["upsertedCount"].as_u64().unwrap_or(batch.len() as u64) as usize;
        }

        info!(namespace, upserted, "Upserted vectors");
        Ok(upserted)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), RetrievalError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "ids": ids, "namespace": namespace });
        self.post("/vectors/delete", &body).await?;
        info!(namespace, count = ids.len(), "Deleted vectors");
        Ok(())
    }
}
