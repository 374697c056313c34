//! Multi-modal product search.
//!
//! Embeds a query, asks the vector index once per requested modality (with
//! that modality as a filter), concatenates the raw hits and hands them to
//! [`merge_and_rank`]. Queries run one after another; there is no fan-out.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use shopbot_core::error::RetrievalError;
use shopbot_core::records::CATALOG_AVAILABLE;
use shopbot_core::{BusinessId, EmbeddingGenerator, Modality, RankedEntity, RetrievalHit, VectorIndex, VectorQuery};
use tracing::{debug, info};

use crate::rank::merge_and_rank;

/// Tuning for product search.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Raw hits requested per modality
    pub top_k: usize,
    /// Distinct entities returned
    pub top_n: usize,
    /// Tenant namespace is `{namespace_prefix}{business_id}`
    pub namespace_prefix: String,
    /// Modalities queried for a text search
    pub text_modalities: Vec<Modality>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: 10,
            top_n: 5,
            namespace_prefix: "business_".into(),
            text_modalities: vec![Modality::Text],
        }
    }
}

impl SearchSettings {
    pub fn namespace(&self, business_id: BusinessId) -> String {
        format!("{}{}", self.namespace_prefix, business_id)
    }
}

/// Searches one tenant's catalog vectors.
pub struct ProductSearcher {
    embedder: Arc<dyn EmbeddingGenerator>,
    index: Arc<dyn VectorIndex>,
    settings: SearchSettings,
}

impl ProductSearcher {
    pub fn new(
        embedder: Arc<dyn EmbeddingGenerator>,
        index: Arc<dyn VectorIndex>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Search by a free-text query across the configured text modalities.
    pub async fn search_text(
        &self,
        business_id: BusinessId,
        query: &str,
    ) -> Result<Vec<RankedEntity>, RetrievalError> {
        let started = Instant::now();
        let vector = self.embedder.embed_text(query).await?;
        debug!(
            embedder = self.embedder.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Embedded text query"
        );
        self.search_vector(business_id, vector, &self.settings.text_modalities)
            .await
    }

    /// Search by image similarity.
    ///
    /// Returns `Ok(None)` when the image could not be fetched or embedded.
    pub async fn search_image(
        &self,
        business_id: BusinessId,
        image_url: &str,
    ) -> Result<Option<Vec<RankedEntity>>, RetrievalError> {
        let Some(vector) = self.embedder.embed_image(image_url).await else {
            info!(business_id, image_url, "Image could not be embedded");
            return Ok(None);
        };
        self.search_vector(business_id, vector, &[Modality::Image])
            .await
            .map(Some)
    }

    /// Query the tenant namespace once per modality and rank the union.
    ///
    /// An empty `modalities` slice queries once without a modality filter.
    pub async fn search_vector(
        &self,
        business_id: BusinessId,
        vector: Vec<f32>,
        modalities: &[Modality],
    ) -> Result<Vec<RankedEntity>, RetrievalError> {
        let started = Instant::now();
        let namespace = self.settings.namespace(business_id);

        let mut filter = serde_json::Map::new();
        filter.insert("status".into(), json!(CATALOG_AVAILABLE));
        filter.insert("business_id".into(), json!(business_id));

        let passes: Vec<Option<Modality>> = if modalities.is_empty() {
            vec![None]
        } else {
            modalities.iter().copied().map(Some).collect()
        };

        let mut hits: Vec<RetrievalHit> = Vec::new();
        for modality in passes {
            let query = VectorQuery {
                vector: vector.clone(),
                namespace: namespace.clone(),
                top_k: self.settings.top_k,
                modality,
                filter: filter.clone(),
            };
            hits.extend(self.index.query(query).await?);
        }

        let ranked = merge_and_rank(&hits, self.settings.top_n);
        info!(
            business_id,
            index = self.index.name(),
            raw_hits = hits.len(),
            entities = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Product search complete"
        );
        Ok(ranked)
    }
}
