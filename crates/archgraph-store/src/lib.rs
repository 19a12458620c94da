//! Archgraph Store: cache, search index, snapshots and the persistence facade

pub mod error;
pub mod cache;
pub mod index;
pub mod snapshot;
pub mod registry;
pub mod lease;
pub mod store;

#[cfg(test)]
pub mod tests;

pub use error::StoreError;
pub use cache::{FsCache, KvCache, MemoryCache};
pub use index::{IndexRecord, LocalIndex, SearchIndex, Selector};
pub use snapshot::SnapshotWriter;
pub use registry::SnapshotRegistry;
pub use lease::{LeaseGuard, LeaseTable};
pub use store::{
    CachedGraph, GraphMeta, GraphStore, IndexSync, NodeView, SyncMode, keys, collections,
};
