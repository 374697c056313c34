//! File-backed record store: one JSON document, loaded into memory.
//!
//! The document is read on open and rewritten on every mutation, giving
//! fast reads with durable writes. A store opened without a path is purely
//! in-memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shopbot_core::error::RecordError;
use shopbot_core::records::IntentStatus;
use shopbot_core::{BusinessId, CatalogEntry, IntentDefinition, RecordLookup, TenantRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Enables a global intent for one tenant, optionally overriding its template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentLink {
    pub business_id: BusinessId,
    pub intent_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_override: Option<String>,
    #[serde(default)]
    pub status: IntentStatus,
}

/// The whole record document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub tenants: Vec<TenantRecord>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    /// Global intent definitions
    #[serde(default)]
    pub intents: Vec<IntentDefinition>,
    /// Per-tenant enablement of global intents
    #[serde(default)]
    pub intent_links: Vec<IntentLink>,
}

/// A [`RecordLookup`] over a [`RecordSet`], persisted to a JSON file.
pub struct RecordStore {
    path: Option<PathBuf>,
    records: Arc<RwLock<RecordSet>>,
}

impl RecordStore {
    /// Open the store at `path`. A missing file starts empty; it is created
    /// on first write.
    pub fn open(path: &Path) -> Result<Self, RecordError> {
        let records = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<RecordSet>(&content).map_err(|e| {
                RecordError::Corrupted(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecordSet::default(),
            Err(e) => {
                return Err(RecordError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        debug!(
            path = %path.display(),
            tenants = records.tenants.len(),
            catalog = records.catalog.len(),
            intents = records.intents.len(),
            "Record store loaded"
        );
        Ok(Self {
            path: Some(path.to_path_buf()),
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// An in-memory store that never touches disk.
    pub fn in_memory(records: RecordSet) -> Self {
        Self {
            path: None,
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Insert or replace a tenant by id.
    pub async fn upsert_tenant(&self, tenant: TenantRecord) -> Result<(), RecordError> {
        {
            let mut records = self.records.write().await;
            records.tenants.retain(|t| t.id != tenant.id);
            records.tenants.push(tenant);
        }
        self.flush().await
    }

    /// Insert or replace a catalog entry by id.
    pub async fn upsert_catalog_entry(&self, entry: CatalogEntry) -> Result<(), RecordError> {
        {
            let mut records = self.records.write().await;
            records.catalog.retain(|e| e.id != entry.id);
            records.catalog.push(entry);
        }
        self.flush().await
    }

    /// Enable a global intent for a tenant.
    pub async fn link_intent(&self, link: IntentLink) -> Result<(), RecordError> {
        {
            let mut records = self.records.write().await;
            let known = records.intents.iter().any(|i| i.id == link.intent_id);
            if !known {
                return Err(RecordError::QueryFailed(format!(
                    "unknown intent id {}",
                    link.intent_id
                )));
            }
            records
                .intent_links
                .retain(|l| !(l.business_id == link.business_id && l.intent_id == link.intent_id));
            records.intent_links.push(link);
        }
        self.flush().await
    }

    /// A copy of the whole document.
    pub async fn snapshot(&self) -> RecordSet {
        self.records.read().await.clone()
    }

    async fn flush(&self) -> Result<(), RecordError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let records = self.records.read().await;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RecordError::Storage(format!("Failed to create records directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(&*records)
            .map_err(|e| RecordError::Storage(format!("Failed to serialize records: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| RecordError::Storage(format!("Failed to write records file: {e}")))?;
        info!(path = %path.display(), "Records flushed");
        Ok(())
    }
}

#[async_trait]
impl RecordLookup for RecordStore {
    async fn get_enabled_intents(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<IntentDefinition>, RecordError> {
        let records = self.records.read().await;
        let intents = records
            .intent_links
            .iter()
            .filter(|link| link.business_id == business_id && link.status == IntentStatus::Enabled)
            .filter_map(|link| {
                let intent = records
                    .intents
                    .iter()
                    .find(|i| i.id == link.intent_id && i.status == IntentStatus::Enabled)?;
                let mut resolved = intent.clone();
                if link.template_override.is_some() {
                    resolved.template = link.template_override.clone();
                }
                Some(resolved)
            })
            .collect();
        Ok(intents)
    }

    async fn get_tenant(&self, business_id: BusinessId) -> Result<Option<TenantRecord>, RecordError> {
        let records = self.records.read().await;
        Ok(records
            .tenants
            .iter()
            .find(|t| t.id == business_id && t.is_active())
            .cloned())
    }

    async fn get_active_catalog_entries(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<CatalogEntry>, RecordError> {
        let records = self.records.read().await;
        Ok(records
            .catalog
            .iter()
            .filter(|e| e.business_id == business_id && e.is_available())
            .cloned()
            .collect())
    }
}
