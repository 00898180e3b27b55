//! Session result cache
//!
//! Maps request keys to completed results for the lifetime of the process.
//! Entries are never mutated once written. An optional capacity turns the
//! cache into an LRU; without one it grows with the number of distinct
//! requests made in the session.

use crate::types::GenerationResult;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod key;

pub use key::{build_key, request_key, KeyPart};

pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of the LRU; `None` or 0 keeps every entry for the session
    #[serde(default = "default_max_entries")]
    pub max_entries: Option<usize>,
}

fn default_max_entries() -> Option<usize> {
    Some(DEFAULT_CACHE_CAPACITY)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Result cache keyed by [`build_key`] output
pub struct ResultCache {
    /// Least recently used first
    entries: Mutex<IndexMap<String, GenerationResult>>,
    max_entries: Option<usize>,
}

impl ResultCache {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            max_entries: max_entries.filter(|max| *max > 0),
        }
    }

    /// Cache with no capacity bound.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn get(&self, key: &str) -> Option<GenerationResult> {
        let mut entries = self.entries.lock();
        let index = entries.get_index_of(key)?;
        let last = entries.len() - 1;
        entries.move_index(index, last);
        entries.get_index(last).map(|(_, result)| result.clone())
    }

    /// Store a result. The first result written for a key wins.
    pub fn put(&self, key: impl Into<String>, result: GenerationResult) {
        let key = key.into();
        let mut entries = self.entries.lock();
        if entries.contains_key(&key) {
            return;
        }
        entries.insert(key, result);

        if let Some(max) = self.max_entries {
            while entries.len() > max {
                if let Some((evicted, _)) = entries.shift_remove_index(0) {
                    debug!(key = %evicted, max_entries = max, "Evicted least recently used cache entry");
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl From<&CacheConfig> for ResultCache {
    fn from(config: &CacheConfig) -> Self {
        Self::new(config.max_entries)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::unbounded()
    }
}
