//! Bounded snapshot history kept in the cache

use std::sync::Arc;

use archgraph_core::{BoundedHistory, SnapshotMeta};
use tokio::sync::Mutex;

use crate::{KvCache, StoreError};

/// Newest-first list of [`SnapshotMeta`] under one cache key, capped at a
/// fixed capacity. Pushes are serialized so concurrent builds cannot drop
/// each other's entries.
pub struct SnapshotRegistry {
    cache: Arc<dyn KvCache>,
    key: String,
    capacity: usize,
    lock: Mutex<()>,
}

impl SnapshotRegistry {
    pub fn new(cache: Arc<dyn KvCache>, key: impl Into<String>, capacity: usize) -> Self {
        SnapshotRegistry {
            cache,
            key: key.into(),
            capacity,
            lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current history. A corrupt entry is logged and treated as empty.
    pub async fn load(&self) -> Result<BoundedHistory<SnapshotMeta>, StoreError> {
        let items = match self.cache.get(&self.key).await? {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<SnapshotMeta>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!("Discarding unreadable snapshot registry {}: {}", self.key, e);
                    Vec::new()
                }
            },
        };
        Ok(BoundedHistory::from_newest_first(self.capacity, items))
    }

    /// Push `meta` to the front, evicting the oldest entry when full.
    pub async fn record(&self, meta: SnapshotMeta) -> Result<Option<SnapshotMeta>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut history = self.load().await?;
        let evicted = history.push(meta);
        let items: Vec<&SnapshotMeta> = history.iter().collect();
        self.cache.set(&self.key, serde_json::to_string(&items)?).await?;
        if let Some(old) = &evicted {
            tracing::debug!("Snapshot history full, evicted {}", old.id);
        }
        Ok(evicted)
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<SnapshotMeta>, StoreError> {
        Ok(self.load().await?.recent(limit).cloned().collect())
    }
}
