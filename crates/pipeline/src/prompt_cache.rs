//! Registry of server-side cached prompt prefixes.
//!
//! Keyed by a content hash of the instruction and static context, so any
//! change to either produces a new key and never reuses a stale prefix.

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use shopbot_core::CachedPrefix;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Hex SHA-256 of `instruction`, a NUL separator, then `static_context`.
pub fn cache_key(instruction: &str, static_context: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(instruction.as_bytes());
    hasher.update([0u8]);
    hasher.update(static_context.as_bytes());
    hex::encode(hasher.finalize())
}

/// Longest lifetime any cache entry is given, whatever TTL was asked for.
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Expiry instant for an entry stored at `now`. Never overflows.
pub(crate) fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(MAX_ENTRY_TTL)).unwrap_or(now)
}

#[derive(Debug, Clone)]
pub struct PromptCacheEntry {
    pub cache_key: String,
    pub prefix: CachedPrefix,
    pub expires_at: Instant,
}

impl PromptCacheEntry {
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Owned by the generation orchestrator; last writer wins per key.
#[derive(Default)]
pub struct PromptCache {
    entries: RwLock<HashMap<String, PromptCacheEntry>>,
}

impl PromptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live entry for `key`. Expired entries are dropped on the way.
    pub async fn get_live(&self, key: &str) -> Option<PromptCacheEntry> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
            debug!(cache_key = %short(key), "Prompt prefix expired");
        }
        None
    }

    /// Record a freshly created prefix; it expires after the provider TTL.
    pub async fn insert(&self, key: &str, prefix: CachedPrefix) -> PromptCacheEntry {
        let entry = PromptCacheEntry {
            cache_key: key.to_string(),
            expires_at: expiry_after(Instant::now(), prefix.ttl),
            prefix,
        };
        self.entries.write().await.insert(key.to_string(), entry.clone());
        entry
    }

    pub async fn evict(&self, key: &str) {
        if self.entries.write().await.remove(key).is_some() {
            debug!(cache_key = %short(key), "Prompt prefix evicted");
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}
