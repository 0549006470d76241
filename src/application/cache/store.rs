//! Generic cache-aside repository.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OwnedMutexGuard;

use super::locks::KeyLocks;
use crate::domain::Record;
use crate::error::Result;
use crate::port::{Clock, MutableTable, Table};

/// In-process cache in front of a backing [`Table`].
///
/// Reads consult the cache first and populate it on a miss; absent keys are
/// not cached. Writes go to the table first and only touch the cache once
/// the table accepted them, so a failed write leaves the cache as it was.
pub struct CacheAsideStore<R: Record, T> {
    table: T,
    cache: DashMap<R::Key, R>,
    locks: KeyLocks<R::Key>,
    clock: Arc<dyn Clock>,
}

impl<R: Record, T: Table<R>> CacheAsideStore<R, T> {
    pub fn new(table: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            table,
            cache: DashMap::new(),
            locks: KeyLocks::new(),
            clock,
        }
    }

    /// The backing table, for queries the cache does not serve.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// Cached row for `key` without falling back to the table.
    pub fn cached(&self, key: &R::Key) -> Option<R> {
        self.cache.get(key).map(|row| row.value().clone())
    }

    /// Copy of every cached row.
    pub fn cached_rows(&self) -> Vec<R> {
        self.cache.iter().map(|row| row.value().clone()).collect()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_cache_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop the cached row for `key`, leaving the table untouched.
    pub fn evict(&self, key: &R::Key) {
        self.cache.remove(key);
    }

    /// Serialize with every other writer of `key`.
    pub async fn lock(&self, key: &R::Key) -> OwnedMutexGuard<()> {
        self.locks.lock(key).await
    }

    pub async fn get(&self, key: &R::Key) -> Result<Option<R>> {
        if let Some(hit) = self.cached(key) {
            return Ok(Some(hit));
        }
        let Some(row) = self.table.find(key).await? else {
            return Ok(None);
        };
        // A writer may have cached a newer row while we were reading.
        let cached = self.cache.entry(key.clone()).or_insert(row).value().clone();
        Ok(Some(cached))
    }

    /// Write-through insert of a complete row.
    ///
    /// Does not take the key lock; callers appending to a series hold it.
    pub async fn insert(&self, row: R) -> Result<R> {
        let stored = self.table.insert(&row).await?;
        self.cache.insert(stored.key().clone(), stored.clone());
        Ok(stored)
    }

    /// Evict `key`, then delete its rows from the table.
    pub async fn delete(&self, key: &R::Key) -> Result<bool> {
        let _guard = self.locks.lock(key).await;
        self.cache.remove(key);
        self.table.delete(key).await
    }

    /// Replace the cache with every current row of the table.
    ///
    /// Meant for startup; concurrent writers may be overwritten by the
    /// rows loaded here.
    pub async fn refresh_cache(&self) -> Result<usize> {
        let rows = self.table.load_all().await?;
        self.cache.clear();
        for row in rows {
            self.cache.insert(row.key().clone(), row);
        }
        Ok(self.cache.len())
    }

    /// Run a storage operation that yields the new row for `key` under the
    /// key lock, caching its result on success.
    pub async fn write_through<F, Fut>(&self, key: &R::Key, op: F) -> Result<R>
    where
        T: Clone,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let _guard = self.locks.lock(key).await;
        let stored = op(self.table.clone()).await?;
        self.cache.insert(key.clone(), stored.clone());
        Ok(stored)
    }
}

impl<R: Record, T: MutableTable<R>> CacheAsideStore<R, T> {
    /// Apply `patch` to the current row, or create the row from defaults
    /// plus `patch` when there is none.
    pub async fn set(&self, key: &R::Key, patch: &R::Patch) -> Result<R> {
        let _guard = self.locks.lock(key).await;
        let stored = match self.table.find(key).await? {
            Some(mut current) => {
                current.apply(patch);
                self.table.update(&current).await?
            }
            None => {
                let row = R::create(key.clone(), patch, self.clock.now());
                self.table.insert(&row).await?
            }
        };
        self.cache.insert(key.clone(), stored.clone());
        Ok(stored)
    }
}
