//! Retention Manager: bounded newest-first history, capacity 5
//!
//! The manager knows nothing about the storage medium. It sees a store
//! through two operations, a recency-ordered fetch and a delete, and
//! enforces the cap identically over the local file-backed set and the
//! remote document set. Physical delete failures are logged and swallowed;
//! the bound on the retained set must hold regardless.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::PersistenceError;
use crate::file_store::{DatasetHandle, FileStore};

/// Maximum number of retained datasets per storage tier.
pub const RETAIN_LIMIT: usize = 5;

/// Storage seam the retention manager operates through.
#[async_trait]
pub trait RetainedStore {
    type Item: Send + Sync;
    type Error: std::fmt::Display + Send;

    /// All retained items, newest first.
    async fn fetch_ordered(&self) -> Result<Vec<Self::Item>, Self::Error>;

    /// Physically delete one item (blob before index entry).
    async fn delete(&self, item: &Self::Item) -> Result<(), Self::Error>;

    /// Short label for logs.
    fn describe(item: &Self::Item) -> String;
}

#[derive(Debug, Clone)]
pub struct RetentionManager {
    limit: usize,
}

impl Default for RetentionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionManager {
    pub fn new() -> Self {
        Self {
            limit: RETAIN_LIMIT,
        }
    }

    /// Non-default capacity, for tests.
    pub fn with_limit(limit: usize) -> Self {
        Self { limit }
    }

    /// Evict every item beyond the capacity, oldest first in effect since
    /// the fetch is newest-first. Returns the number of evicted items.
    ///
    /// Fetch failures propagate; delete failures do not. The baseline
    /// count-then-delete sequence is not atomic across index and storage;
    /// callers serialize admits per tier (see `sync`).
    pub async fn enforce<S: RetainedStore>(&self, store: &S) -> Result<usize, S::Error> {
        let items = store.fetch_ordered().await?;
        let mut evicted = 0;

        for item in items.iter().skip(self.limit) {
            if let Err(e) = store.delete(item).await {
                warn!(item = %S::describe(item), error = %e, "eviction delete failed, continuing");
            }
            evicted += 1;
        }

        if evicted > 0 {
            info!(evicted, limit = self.limit, "retention enforced");
        }
        Ok(evicted)
    }

    /// The retained items, newest first, capped at the limit.
    pub async fn list<S: RetainedStore>(&self, store: &S) -> Result<Vec<S::Item>, S::Error> {
        let mut items = store.fetch_ordered().await?;
        items.truncate(self.limit);
        Ok(items)
    }
}

#[async_trait]
impl RetainedStore for FileStore {
    type Item = DatasetHandle;
    type Error = PersistenceError;

    async fn fetch_ordered(&self) -> Result<Vec<DatasetHandle>, PersistenceError> {
        self.list_recent()
    }

    async fn delete(&self, item: &DatasetHandle) -> Result<(), PersistenceError> {
        FileStore::delete(self, item)
    }

    fn describe(item: &DatasetHandle) -> String {
        format!("{} ({})", item.filename, item.id)
    }
}
