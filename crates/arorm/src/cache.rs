//! SELECT result caching.
//!
//! The executor looks results up by [`cache_key`]: SHA-256 over the final SQL
//! text followed by the digest of every bound value. Only non-empty result
//! sets are stored.

use crate::row::Row;
use crate::value::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Key-value store for result sets.
pub trait ResultCache: Send + Sync {
    /// Rows stored under `key`, if they are younger than `max_age`.
    fn get(&self, key: &str, max_age: Duration) -> Option<Vec<Row>>;

    fn set(&self, key: &str, rows: &[Row]);

    fn delete(&self, key: &str);

    fn clear(&self);
}

/// Process-local [`ResultCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Instant, Vec<Row>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, key: &str, max_age: Duration) -> Option<Vec<Row>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored_at, rows) = entries.get(key)?;
        if stored_at.elapsed() <= max_age {
            return Some(rows.clone());
        }
        entries.remove(key);
        None
    }

    fn set(&self, key: &str, rows: &[Row]) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (Instant::now(), rows.to_vec()));
    }

    fn delete(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Cache key for a statement and its bound values.
pub fn cache_key(sql: &str, params: &[Value]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    for param in params {
        hasher.update(param.digest().as_bytes());
    }
    hex::encode(hasher.finalize())
}
