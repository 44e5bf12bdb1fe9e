//! In-memory memoization of expensive table computations.
//!
//! Loading and aligning a session decodes every raw recording of a subject.
//! A [`TableCache`] can be shared between dataset values so the same
//! subject is only processed once.

use crate::core::table::SensorTable;
use crate::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifies one cached result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub root: PathBuf,
    pub operation: &'static str,
    pub subject: String,
    pub test: Option<String>,
}

impl CacheKey {
    pub fn new(root: &Path, operation: &'static str, subject: &str, test: Option<&str>) -> Self {
        Self {
            root: root.to_path_buf(),
            operation,
            subject: subject.to_string(),
            test: test.map(str::to_string),
        }
    }
}

/// Shared cache of computed tables.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct TableCache {
    entries: Arc<Mutex<HashMap<CacheKey, Arc<SensorTable>>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `key` or compute and store it.
    ///
    /// Errors are not cached. The lock is not held while computing.
    pub fn cached<F>(&self, key: CacheKey, compute: F) -> Result<Arc<SensorTable>>
    where
        F: FnOnce() -> Result<SensorTable>,
    {
        if let Some(table) = self.get(&key) {
            tracing::debug!(
                "Cache hit for {} of subject {}",
                key.operation,
                key.subject
            );
            return Ok(table);
        }

        let table = Arc::new(compute()?);
        self.lock().insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Entries are only inserted or removed whole, so a panic in another
    /// holder of the lock cannot leave them half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<SensorTable>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Table cache lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<SensorTable>> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all cached tables.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::{ColumnKey, TimeIndex};
    use crate::error::DatasetError;
    use std::cell::Cell;

    fn table(value: f64) -> SensorTable {
        let mut table = SensorTable::new(TimeIndex::Frames(2));
        table
            .push_column(ColumnKey::new("l_heel", "acc_x"), vec![value; 2])
            .unwrap();
        table
    }

    fn key(subject: &str) -> CacheKey {
        CacheKey::new(Path::new("/data"), "session", subject, None)
    }

    #[test]
    fn test_computes_once() {
        let cache = TableCache::new();
        let calls = Cell::new(0);
        for _ in 0..3 {
            let t = cache
                .cached(key("4d91"), || {
                    calls.set(calls.get() + 1);
                    Ok(table(1.0))
                })
                .unwrap();
            assert_eq!(t.column("l_heel", "acc_x").unwrap()[0], 1.0);
        }
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_keys_are_distinct() {
        let cache = TableCache::new();
        cache.cached(key("4d91"), || Ok(table(1.0))).unwrap();
        let other = cache.cached(key("5237"), || Ok(table(2.0))).unwrap();
        assert_eq!(other.column("l_heel", "acc_x").unwrap()[0], 2.0);

        let with_test = CacheKey::new(Path::new("/data"), "session", "4d91", Some("fast_10"));
        assert!(cache.get(&with_test).is_none());
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = TableCache::new();
        let failed = cache.cached(key("4d91"), || Err(DatasetError::NoDataFolder));
        assert!(failed.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = TableCache::new();
        let clone = cache.clone();
        clone.cached(key("4d91"), || Ok(table(1.0))).unwrap();
        assert!(cache.get(&key("4d91")).is_some());
        cache.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_poisoned_lock_keeps_entries() {
        let cache = TableCache::new();
        cache.cached(key("4d91"), || Ok(table(1.0))).unwrap();

        let shared = cache.clone();
        let handle = std::thread::spawn(move || {
            let _guard = shared.entries.lock().unwrap();
            panic!("poison the cache lock");
        });
        assert!(handle.join().is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.len(), 1);
        let calls = Cell::new(0);
        cache
            .cached(key("4d91"), || {
                calls.set(calls.get() + 1);
                Ok(table(2.0))
            })
            .unwrap();
        assert_eq!(calls.get(), 0);
        cache.cached(key("5237"), || Ok(table(2.0))).unwrap();
        assert_eq!(cache.len(), 2);
    }
}
