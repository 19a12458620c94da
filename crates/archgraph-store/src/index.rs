//! Search-index collaborators
//!
//! An index is a set of named collections of records. Inserts of ids that
//! already exist and deletes of ids that do not are both harmless: the first
//! is reported as [`StoreError::AlreadyExists`] after the rest of the batch
//! is written, the second simply counts zero.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl IndexRecord {
    pub fn new(id: impl Into<String>, document: impl Into<String>, metadata: Map<String, Value>) -> Self {
        IndexRecord {
            id: id.into(),
            document: document.into(),
            metadata,
        }
    }

    /// Every key of `filter` is present in the metadata with an equal value.
    pub fn matches(&self, filter: &Map<String, Value>) -> bool {
        filter
            .iter()
            .all(|(key, value)| self.metadata.get(key) == Some(value))
    }
}

/// Which records a delete applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Ids(Vec<String>),
    Where(Map<String, Value>),
    All,
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Insert `records`. Returns the number inserted, or `AlreadyExists`
    /// naming the ids that were skipped because they were present.
    async fn add(&self, collection: &str, records: Vec<IndexRecord>) -> Result<usize, StoreError>;

    /// Returns the number of records removed.
    async fn delete(&self, collection: &str, selector: Selector) -> Result<usize, StoreError>;

    /// Records whose metadata matches `filter`; an empty filter matches all.
    async fn query(&self, collection: &str, filter: &Map<String, Value>) -> Result<Vec<IndexRecord>, StoreError>;

    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<IndexRecord>, StoreError>;

    async fn count(&self, collection: &str) -> Result<usize, StoreError>;
}

type Collection = BTreeMap<String, IndexRecord>;

/// In-process index with an optional JSON file behind it.
///
/// Collections are kept in id order, so queries return records sorted by id.
/// When a path is set every mutation rewrites the file atomically.
#[derive(Debug, Default)]
pub struct LocalIndex {
    collections: DashMap<String, Collection>,
    path: Option<PathBuf>,
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalIndex {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or start) an index persisted at `path`. A missing file is an
    /// empty index; an unreadable one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let stored: BTreeMap<String, Collection> = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Opened search index {} ({} collections)", path.display(), stored.len());
        let collections = stored.into_iter().collect();
        Ok(LocalIndex {
            collections,
            path: Some(path),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        let snapshot: BTreeMap<String, Collection> = self
            .collections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let content = serde_json::to_string(&snapshot)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for LocalIndex {
    async fn add(&self, collection: &str, records: Vec<IndexRecord>) -> Result<usize, StoreError> {
        let mut existing = Vec::new();
        let mut inserted = 0;
        {
            let mut target = self.collections.entry(collection.to_string()).or_default();
            for record in records {
                if target.contains_key(&record.id) {
                    existing.push(record.id);
                } else {
                    target.insert(record.id.clone(), record);
                    inserted += 1;
                }
            }
        }
        if inserted > 0 {
            self.persist().await?;
        }

        if existing.is_empty() {
            Ok(inserted)
        } else {
            Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                ids: existing,
            })
        }
    }

    async fn delete(&self, collection: &str, selector: Selector) -> Result<usize, StoreError> {
        let removed = match self.collections.get_mut(collection) {
            None => 0,
            Some(mut target) => {
                let before = target.len();
                match &selector {
                    Selector::Ids(ids) => {
                        for id in ids {
                            target.remove(id);
                        }
                    }
                    Selector::Where(filter) => target.retain(|_, record| !record.matches(filter)),
                    Selector::All => target.clear(),
                }
                before - target.len()
            }
        };
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    async fn query(&self, collection: &str, filter: &Map<String, Value>) -> Result<Vec<IndexRecord>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|target| {
                target
                    .values()
                    .filter(|record| record.matches(filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<IndexRecord>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .map(|target| ids.iter().filter_map(|id| target.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.collections.get(collection).map(|t| t.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, role: &str) -> IndexRecord {
        let metadata = json!({ "role": role }).as_object().cloned().unwrap();
        IndexRecord::new(id, id, metadata)
    }

    fn filter(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_add_reports_existing_ids_after_inserting_the_rest() {
        let index = LocalIndex::in_memory();
        assert_eq!(index.add("c", vec![record("a", "owner")]).await.unwrap(), 1);

        let err = index
            .add("c", vec![record("a", "owner"), record("b", "system")])
            .await
            .unwrap_err();
        match err {
            StoreError::AlreadyExists { collection, ids } => {
                assert_eq!(collection, "c");
                assert_eq!(ids, vec!["a".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(index.count("c").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_missing_is_zero() {
        let index = LocalIndex::in_memory();
        assert_eq!(index.delete("c", Selector::Ids(vec!["x".into()])).await.unwrap(), 0);
        index.add("c", vec![record("a", "owner")]).await.unwrap();
        assert_eq!(index.delete("c", Selector::Ids(vec!["x".into()])).await.unwrap(), 0);
        assert_eq!(index.delete("c", Selector::Ids(vec!["a".into()])).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_and_delete_where() {
        let index = LocalIndex::in_memory();
        index
            .add("c", vec![record("b", "owner"), record("a", "owner"), record("c", "system")])
            .await
            .unwrap();

        let owners = index.query("c", &filter(json!({"role": "owner"}))).await.unwrap();
        assert_eq!(owners.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);

        let removed = index
            .delete("c", Selector::Where(filter(json!({"role": "owner"}))))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(index.query("c", &Map::new()).await.unwrap().len(), 1);

        assert_eq!(index.delete("c", Selector::All).await.unwrap(), 1);
        assert_eq!(index.count("c").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persisted_index_reopens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("index/search.json");
        {
            let index = LocalIndex::open(&path).unwrap();
            index.add("arch_nodes", vec![record("m.f", "system")]).await.unwrap();
        }
        let reopened = LocalIndex::open(&path).unwrap();
        let got = reopened.get("arch_nodes", &["m.f".to_string()]).await.unwrap();
        assert_eq!(got, vec![record("m.f", "system")]);
    }
}
