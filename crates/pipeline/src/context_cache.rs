//! Per-tenant static context: store facts plus the active catalog, rendered
//! once and reused until its TTL elapses.

use std::collections::HashMap;
use std::time::Duration;

use shopbot_core::records::value_text;
use shopbot_core::{BusinessId, CatalogEntry, Degradation, Outcome, RecordLookup, TenantRecord};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::format::format_vnd;
use crate::prompt_cache::expiry_after;

const STORE_HEADER: &str = "--- THÔNG TIN CỬA HÀNG ---";
const CATALOG_HEADER: &str = "--- DANH SÁCH SẢN PHẨM ---";
const EMPTY_CATALOG: &str = "Chưa có sản phẩm nào.";

/// One cached rendering.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub business_id: BusinessId,
    pub static_text: String,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl TenantContext {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Render store facts and catalog entries as prompt text.
pub fn render_static_context(tenant: Option<&TenantRecord>, catalog: &[CatalogEntry]) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(tenant) = tenant {
        parts.push(STORE_HEADER.into());
        parts.push(format!("Tên cửa hàng: {}", tenant.name));
        if let Some(phone) = &tenant.phone {
            parts.push(format!("Số điện thoại: {phone}"));
        }
        if let Some(address) = &tenant.address {
            parts.push(format!("Địa chỉ: {address}"));
        }
        if let Some(description) = &tenant.description {
            parts.push(format!("Mô tả: {description}"));
        }
        for (key, value) in &tenant.metadata {
            parts.push(format!("{key}: {}", value_text(value)));
        }
        parts.push(String::new());
    }

    parts.push(CATALOG_HEADER.into());
    if catalog.is_empty() {
        parts.push(EMPTY_CATALOG.into());
    } else {
        for entry in catalog {
            parts.push(render_entry(entry));
            parts.push(String::new());
        }
    }

    parts.join("\n").trim().to_string()
}

fn render_entry(entry: &CatalogEntry) -> String {
    let mut lines = vec![format!("Tên: {}", entry.name)];
    if let Some(price) = entry.price.filter(|p| *p != 0.0) {
        lines.push(format!("Giá: {} VNĐ", format_vnd(price)));
    }
    if let Some(description) = entry.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Mô tả: {description}"));
    }
    if let Some(url) = entry.main_image_url.as_deref().filter(|u| !u.is_empty()) {
        lines.push(format!("Ảnh chính: {url}"));
    }
    if let Some(urls) = entry.detail_image_url.as_deref().filter(|u| !u.is_empty()) {
        lines.push(format!("Ảnh chi tiết: {urls}"));
    }
    if let Some(quantity) = entry.quantity_avail {
        lines.push(format!("Số lượng còn: {quantity}"));
    }
    for (key, value) in &entry.metadata {
        lines.push(format!("{key}: {}", value_text(value)));
    }
    lines.join("\n")
}

/// TTL-keyed map of rendered tenant contexts.
///
/// Concurrent rebuilds for one tenant are tolerated; the last writer wins.
/// Nothing invalidates entries implicitly: callers that change tenant or
/// catalog records must call [`TenantContextCache::invalidate`].
#[derive(Default)]
pub struct TenantContextCache {
    entries: RwLock<HashMap<BusinessId, TenantContext>>,
}

impl TenantContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tenant's static context, rebuilt when absent or expired.
    ///
    /// A zero `ttl` always rebuilds and never stores.
    pub async fn get(&self, business_id: BusinessId, ttl: Duration, records: &dyn RecordLookup) -> Outcome<String> {
        let caching = !ttl.is_zero();

        if caching {
            let now = Instant::now();
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&business_id).filter(|e| e.is_live(now)) {
                debug!(business_id, "Tenant context cache hit");
                return Outcome::Ok(entry.static_text.clone());
            }
        }

        let outcome = rebuild(business_id, records).await;

        if caching {
            let mut entries = self.entries.write().await;
            match &outcome {
                Outcome::Ok(text) => {
                    let created_at = Instant::now();
                    entries.insert(
                        business_id,
                        TenantContext {
                            business_id,
                            static_text: text.clone(),
                            created_at,
                            expires_at: expiry_after(created_at, ttl),
                        },
                    );
                    debug!(business_id, ttl_secs = ttl.as_secs(), "Tenant context cached");
                }
                Outcome::Degraded { .. } => {
                    // never serve a partial rendering from cache
                    entries.remove(&business_id);
                }
            }
        }

        outcome
    }

    pub async fn invalidate(&self, business_id: BusinessId) {
        self.entries.write().await.remove(&business_id);
        info!(business_id, "Tenant context invalidated");
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
        info!("All tenant contexts invalidated");
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn rebuild(business_id: BusinessId, records: &dyn RecordLookup) -> Outcome<String> {
    let tenant = records.get_tenant(business_id).await;
    let catalog = records.get_active_catalog_entries(business_id).await;

    let mut failure = None;
    let tenant = tenant.unwrap_or_else(|e| {
        warn!(business_id, error = %e, "Tenant lookup failed");
        failure = Some(e.to_string());
        None
    });
    let catalog = catalog.unwrap_or_else(|e| {
        warn!(business_id, error = %e, "Catalog lookup failed");
        failure.get_or_insert_with(|| e.to_string());
        Vec::new()
    });

    let text = render_static_context(tenant.as_ref(), &catalog);
    match failure {
        None => Outcome::Ok(text),
        Some(reason) => Outcome::degraded(text, Degradation::RecordLookup(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[test]
    fn renders_store_and_catalog() {
        let tenant = sample_tenant();
        let text = render_static_context(Some(&tenant), &sample_catalog());

        assert!(text.starts_with("--- THÔNG TIN CỬA HÀNG ---\nTên cửa hàng: Shop Thời Trang An\nSố điện thoại: 0901234567"));
        assert!(text.contains("shipping_policy: Miễn phí ship đơn từ 500k"));
        assert!(text.contains(
            "--- DANH SÁCH SẢN PHẨM ---\nTên: Áo thun trắng\nGiá: 150,000 VNĐ\nMô tả: Cotton 100%\nẢnh chính: https://cdn.example.com/10.jpg\nSố lượng còn: 20\n\nTên: Sơ mi xanh\nGiá: 320,000 VNĐ"
        ));
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn missing_tenant_and_empty_catalog() {
        let text = render_static_context(None, &[]);
        assert_eq!(text, "--- DANH SÁCH SẢN PHẨM ---\nChưa có sản phẩm nào.");
    }

    #[test]
    fn catalog_metadata_rendered_bare() {
        let mut entry = sample_catalog().remove(1);
        entry.metadata.insert("size".into(), json!("M, L"));
        entry.metadata.insert("weight_g".into(), json!(200));
        let text = render_static_context(None, &[entry]);
        assert!(text.contains("size: M, L"));
        assert!(text.contains("weight_g: 200"));
    }

    #[tokio::test]
    async fn zero_ttl_always_rebuilds() {
        let cache = TenantContextCache::new();
        let records = CountingRecords::sample();

        cache.get(1, Duration::ZERO, &records).await;
        cache.get(1, Duration::ZERO, &records).await;

        assert_eq!(records.tenant_lookups(), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn positive_ttl_rebuilds_once_within_window() {
        let cache = TenantContextCache::new();
        let records = CountingRecords::sample();
        let ttl = Duration::from_secs(30);

        let first = cache.get(1, ttl, &records).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        let second = cache.get(1, ttl, &records).await;

        assert_eq!(first, second);
        assert_eq!(records.tenant_lookups(), 1);
        assert_eq!(records.catalog_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_rebuilt() {
        let cache = TenantContextCache::new();
        let records = CountingRecords::sample();
        let ttl = Duration::from_secs(30);

        cache.get(1, ttl, &records).await;
        tokio::time::advance(Duration::from_secs(31)).await;
        cache.get(1, ttl, &records).await;

        assert_eq!(records.tenant_lookups(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let cache = TenantContextCache::new();
        let records = CountingRecords::sample();
        let ttl = Duration::from_secs(300);

        cache.get(1, ttl, &records).await;
        cache.get(2, ttl, &records).await;
        cache.invalidate(1).await;
        assert_eq!(cache.len().await, 1);

        cache.get(1, ttl, &records).await;
        assert_eq!(records.tenant_lookups(), 3);

        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn failed_lookup_is_degraded_and_not_cached() {
        let cache = TenantContextCache::new();
        let records = CountingRecords {
            fail_tenant: true,
            ..CountingRecords::sample()
        };

        let outcome = cache.get(1, Duration::from_secs(300), &records).await;

        assert!(matches!(outcome.reason(), Some(Degradation::RecordLookup(_))));
        assert!(outcome.value().contains("Tên: Áo thun trắng"));
        assert!(!outcome.value().contains("THÔNG TIN CỬA HÀNG"));
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_caches_without_overflow() {
        let cache = TenantContextCache::new();
        let records = CountingRecords::sample();
        let ttl = Duration::from_secs(u64::MAX);

        let first = cache.get(1, ttl, &records).await;
        let second = cache.get(1, ttl, &records).await;

        assert!(!first.is_degraded());
        assert_eq!(first, second);
        assert_eq!(records.tenant_lookups(), 1);
    }
}
