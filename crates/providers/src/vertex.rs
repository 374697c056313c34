//! Vertex AI multimodal embedder.
//!
//! Text and images are embedded into one shared space by the
//! `multimodalembedding` model, so an image query can match text vectors
//! and vice versa. Images are downloaded and sent base64-encoded.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use shopbot_core::error::ProviderError;
use shopbot_core::provider::EmbeddingGenerator;
use std::time::Duration;
use tracing::{debug, warn};

use crate::http;

/// Calls a Vertex `:predict` endpoint of a multimodal embedding model.
pub struct VertexMultimodalEmbedder {
    /// Full predict URL, e.g.
    /// `https://us-central1-aiplatform.googleapis.com/v1/projects/P/locations/us-central1/publishers/google/models/multimodalembedding@001:predict`
    endpoint: String,
    access_token: String,
    dimension: usize,
    client: reqwest::Client,
}

impl VertexMultimodalEmbedder {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>, dimension: usize) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            dimension,
            client: http::client(Duration::from_secs(30)),
        }
    }

    fn predict_body(&self, instance: Value) -> Value {
        json!({
            "instances": [instance],
            "parameters": { "dimension": self.dimension },
        })
    }

    async fn predict(&self, instance: Value, field: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&self.predict_body(instance))
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status("vertex", response).await?;
        let body = http::json_body(response).await?;
        parse_prediction(&body, field, self.dimension)
    }

    async fn fetch_image(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(http::transport_error)?;
        let response = http::check_status("image-fetch", response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(http::transport_error)?;
        debug!(url, bytes = bytes.len(), "Fetched image for embedding");
        Ok(STANDARD.encode(&bytes))
    }
}

/// Read `predictions[0][field]` as a vector of the expected dimension.
pub(crate) fn parse_prediction(body: &Value, field: &str, dimension: usize) -> Result<Vec<f32>, ProviderError> {
    let values = body["predictions"][0][field]
        .as_array()
        .ok_or_else(|| ProviderError::MalformedResponse(format!("prediction has no '{field}'")))?;

    let vector: Vec<f32> = values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();

    if vector.len() != dimension {
        return Err(ProviderError::MalformedResponse(format!(
            "Expected {dimension}-dimensional embedding, got {}",
            vector.len()
        )));
    }
    Ok(vector)
}

#[async_trait]
impl EmbeddingGenerator for VertexMultimodalEmbedder {
    fn name(&self) -> &str {
        "vertex"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.predict(json!({ "text": text }), "textEmbedding").await
    }

    async fn embed_image(&self, url: &str) -> Option<Vec<f32>> {
        let encoded = match self.fetch_image(url).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(url, error = %e, "Could not fetch image");
                return None;
            }
        };

        match self
            .predict(json!({ "image": { "bytesBase64Encoded": encoded } }), "imageEmbedding")
            .await
        {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(url, error = %e, "Image embedding failed");
                None
            }
        }
    }
}
