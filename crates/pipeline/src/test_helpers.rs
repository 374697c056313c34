//! Shared test helpers: scripted generators, counting record lookup and a
//! seeded product searcher.

use async_trait::async_trait;
use serde_json::json;
use shopbot_core::error::{ProviderError, RecordError};
use shopbot_core::provider::*;
use shopbot_core::records::IntentStatus;
use shopbot_core::retrieval::MODALITY_KEY;
use shopbot_core::{
    BusinessId, CatalogEntry, EmbeddingGenerator, IntentDefinition, RecordLookup, TenantRecord,
    VectorIndex, VectorRecord,
};
use shopbot_retrieval::{InMemoryVectorIndex, ProductSearcher, SearchSettings};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock generator that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue.
/// Panics if more calls are made than results provided.
pub struct SequentialMockGenerator {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    prefix_cache: bool,
    prefix_results: Mutex<Vec<Result<String, ProviderError>>>,
    prefix_calls: AtomicUsize,
}

impl SequentialMockGenerator {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            prefix_cache: false,
            prefix_results: Mutex::new(Vec::new()),
            prefix_calls: AtomicUsize::new(0),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    /// Advertise prefix caching. Creation results are taken from
    /// `handles` in order; once exhausted, fresh handles are minted.
    pub fn with_prefix_cache(mut self, handles: Vec<Result<String, ProviderError>>) -> Self {
        self.prefix_cache = true;
        self.prefix_results = Mutex::new(handles);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prefix_calls(&self) -> usize {
        self.prefix_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for SequentialMockGenerator {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        let responses = self.responses.lock().unwrap();
        if index >= responses.len() {
            panic!(
                "SequentialMockGenerator: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }
        responses[index].clone().map(|text| GenerationResponse {
            text,
            usage: None,
            model: "mock-model".into(),
        })
    }

    fn supports_prefix_cache(&self) -> bool {
        self.prefix_cache
    }

    async fn create_cached_prefix(&self, request: PrefixCacheRequest) -> Result<CachedPrefix, ProviderError> {
        let n = self.prefix_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.prefix_results.lock().unwrap().get(n).cloned();
        let handle = scripted.unwrap_or_else(|| Ok(format!("cachedContents/{n}")))?;
        Ok(CachedPrefix {
            handle,
            ttl: request.ttl,
        })
    }
}

/// A generator whose every call fails.
pub struct FailingGenerator {
    calls: AtomicUsize,
    prefix_cache: bool,
}

impl FailingGenerator {
    pub fn new(prefix_cache: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prefix_cache,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Timeout("generator timed out".into()))
    }

    fn supports_prefix_cache(&self) -> bool {
        self.prefix_cache
    }

    async fn create_cached_prefix(&self, _request: PrefixCacheRequest) -> Result<CachedPrefix, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Network("connection reset".into()))
    }
}

/// An in-memory record lookup that counts calls and can be told to fail.
#[derive(Default)]
pub struct CountingRecords {
    pub tenant: Option<TenantRecord>,
    pub catalog: Vec<CatalogEntry>,
    pub intents: Vec<IntentDefinition>,
    pub fail_tenant: bool,
    pub fail_intents: bool,
    pub intent_calls: AtomicUsize,
    pub tenant_calls: AtomicUsize,
    pub catalog_calls: AtomicUsize,
}

impl CountingRecords {
    pub fn sample() -> Self {
        Self {
            tenant: Some(sample_tenant()),
            catalog: sample_catalog(),
            intents: vec![intent(1, "greetings", None), intent(2, "product_search_text", None)],
            ..Self::default()
        }
    }

    pub fn tenant_lookups(&self) -> usize {
        self.tenant_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordLookup for CountingRecords {
    async fn get_enabled_intents(&self, _business_id: BusinessId) -> Result<Vec<IntentDefinition>, RecordError> {
        self.intent_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_intents {
            return Err(RecordError::QueryFailed("intent table unavailable".into()));
        }
        Ok(self.intents.clone())
    }

    async fn get_tenant(&self, _business_id: BusinessId) -> Result<Option<TenantRecord>, RecordError> {
        self.tenant_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tenant {
            return Err(RecordError::Storage("database is down".into()));
        }
        Ok(self.tenant.clone())
    }

    async fn get_active_catalog_entries(&self, _business_id: BusinessId) -> Result<Vec<CatalogEntry>, RecordError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.catalog.clone())
    }
}

pub fn sample_tenant() -> TenantRecord {
    let mut metadata = serde_json::Map::new();
    metadata.insert("shipping_policy".into(), json!("Miễn phí ship đơn từ 500k"));
    metadata.insert("return_policy".into(), json!("Đổi trả trong 7 ngày"));
    TenantRecord {
        id: 1,
        name: "Shop Thời Trang An".into(),
        phone: Some("0901234567".into()),
        address: Some("12 Lê Lợi, Quận 1".into()),
        description: Some("Chuyên áo thun và sơ mi".into()),
        status: 1,
        metadata,
    }
}

pub fn sample_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            id: 10,
            business_id: 1,
            name: "Áo thun trắng".into(),
            description: Some("Cotton 100%".into()),
            price: Some(150000.0),
            main_image_url: Some("https://cdn.example.com/10.jpg".into()),
            detail_image_url: None,
            quantity_avail: Some(20),
            status: "1".into(),
            metadata: serde_json::Map::new(),
        },
        CatalogEntry {
            id: 11,
            business_id: 1,
            name: "Sơ mi xanh".into(),
            description: None,
            price: Some(320000.0),
            main_image_url: None,
            detail_image_url: None,
            quantity_avail: None,
            status: "1".into(),
            metadata: serde_json::Map::new(),
        },
    ]
}

pub fn intent(id: i64, intent_type: &str, template: Option<&str>) -> IntentDefinition {
    IntentDefinition {
        id,
        name: intent_type.into(),
        intent_type: intent_type.into(),
        template: template.map(String::from),
        description: None,
        status: IntentStatus::Enabled,
    }
}

/// Embeds text to `[1, 0]` and images to `[0, 1]`.
pub struct FixedEmbedder {
    pub fail_text: bool,
}

#[async_trait]
impl EmbeddingGenerator for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        2
    }

    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        if self.fail_text {
            return Err(ProviderError::Network("embedding service down".into()));
        }
        Ok(vec![1.0, 0.0])
    }

    async fn embed_image(&self, url: &str) -> Option<Vec<f32>> {
        (!url.contains("broken")).then(|| vec![0.0, 1.0])
    }
}

fn vector(id: &str, values: Vec<f32>, modality: &str, name: &str, price: f64) -> VectorRecord {
    let mut metadata = serde_json::Map::new();
    metadata.insert("business_id".into(), json!(1));
    metadata.insert("status".into(), json!("1"));
    metadata.insert(MODALITY_KEY.into(), json!(modality));
    metadata.insert("name".into(), json!(name));
    metadata.insert("price".into(), json!(price));
    VectorRecord {
        id: id.into(),
        values,
        metadata,
    }
}

/// Tenant 1's namespace holding two products with text and image vectors.
pub async fn seeded_index() -> Arc<InMemoryVectorIndex> {
    let index = Arc::new(InMemoryVectorIndex::new(2));
    index
        .upsert(
            "business_1",
            vec![
                vector("10_text", vec![0.9, 0.1], "text", "Áo thun trắng", 150000.0),
                vector("10_image_main", vec![0.1, 0.9], "image", "Áo thun trắng", 150000.0),
                vector("11_text", vec![0.6, 0.4], "text", "Sơ mi xanh", 320000.0),
            ],
        )
        .await
        .unwrap();
    index
}

/// A searcher over [`seeded_index`].
pub async fn seeded_searcher(fail_text: bool) -> Arc<ProductSearcher> {
    Arc::new(ProductSearcher::new(
        Arc::new(FixedEmbedder { fail_text }),
        seeded_index().await,
        SearchSettings::default(),
    ))
}
