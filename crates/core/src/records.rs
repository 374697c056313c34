//! Tenant-scoped business records and the lookup trait that serves them.
//!
//! Records are owned by an external store; the pipeline only reads them
//! through [`RecordLookup`] by business identifier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Identifier of a tenant (a shop).
pub type BusinessId = i64;

/// Identifier of an end customer of a tenant.
pub type CustomerId = i64;

/// The intent type every tenant implicitly supports.
pub const FALLBACK_INTENT: &str = "others";

/// Whether an intent definition participates in routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    #[default]
    Enabled,
    Disabled,
}

/// A routable intent, as configured for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    pub id: i64,

    /// Human-readable name
    pub name: String,

    /// The string key used for strategy selection (e.g. "greetings")
    #[serde(rename = "type")]
    pub intent_type: String,

    /// Optional reply template (tenant override already applied)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: IntentStatus,
}

/// A tenant's business record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: BusinessId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// 1 = active, 0 = inactive
    #[serde(default = "default_active")]
    pub status: i32,

    /// Free-form facts (policies, opening hours, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_active() -> i32 {
    1
}

impl TenantRecord {
    pub fn is_active(&self) -> bool {
        self.status == 1
    }

    /// A metadata value rendered as plain text (strings without quotes).
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(value_text)
    }
}

/// Status code of a catalog entry that can be sold.
pub const CATALOG_AVAILABLE: &str = "1";

/// A product in a tenant's catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,

    pub business_id: BusinessId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image_url: Option<String>,

    /// Comma-separated list of detail image URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_avail: Option<i64>,

    /// "1" = available, "2" = sold out, "3" = discontinued
    #[serde(default = "default_catalog_status")]
    pub status: String,

    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_catalog_status() -> String {
    CATALOG_AVAILABLE.into()
}

impl CatalogEntry {
    pub fn is_available(&self) -> bool {
        self.status == CATALOG_AVAILABLE
    }
}

/// Render a JSON value as prompt text: strings bare, everything else as JSON.
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The routing decision for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Never empty
    pub intent_type: String,

    /// Always within [0, 1]
    pub confidence: f32,

    #[serde(default)]
    pub related_intents: Vec<String>,
}

impl ClassificationResult {
    /// The default routing result: `others` at 0.5 with no related intents.
    pub fn fallback() -> Self {
        Self {
            intent_type: FALLBACK_INTENT.into(),
            confidence: 0.5,
            related_intents: Vec::new(),
        }
    }
}

/// Read-only access to tenant, catalog and intent records.
///
/// Implementations: JSON file store, in-memory fixtures.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// Enabled intent definitions for the tenant, templates resolved.
    async fn get_enabled_intents(
        &self,
        business_id: BusinessId,
    ) -> std::result::Result<Vec<IntentDefinition>, RecordError>;

    /// The tenant record, if it exists and is active.
    async fn get_tenant(
        &self,
        business_id: BusinessId,
    ) -> std::result::Result<Option<TenantRecord>, RecordError>;

    /// Catalog entries of the tenant that are currently available.
    async fn get_active_catalog_entries(
        &self,
        business_id: BusinessId,
    ) -> std::result::Result<Vec<CatalogEntry>, RecordError>;
}
