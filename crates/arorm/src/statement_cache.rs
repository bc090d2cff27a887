//! Per-connection LRU cache of prepared statements, keyed by final SQL text.

use std::collections::HashMap;

/// Each entry carries the tick of its last use; the lowest tick is evicted.
#[derive(Debug)]
pub(crate) struct StatementCache<S> {
    capacity: usize,
    clock: u64,
    entries: HashMap<String, (S, u64)>,
}

impl<S: Clone> StatementCache<S> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            clock: 0,
            entries: HashMap::with_capacity(capacity),
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub(crate) fn get(&mut self, sql: &str) -> Option<S> {
        let now = self.tick();
        let (stmt, used) = self.entries.get_mut(sql)?;
        *used = now;
        Some(stmt.clone())
    }

    /// Store `stmt` unless `sql` is already cached; returns the cached one.
    pub(crate) fn insert_if_absent(&mut self, sql: String, stmt: S) -> S {
        if let Some(existing) = self.get(&sql) {
            return existing;
        }
        if self.capacity == 0 {
            return stmt;
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        let now = self.tick();
        self.entries.insert(sql, (stmt.clone(), now));
        stmt
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (_, used))| *used)
            .map(|(sql, _)| sql.clone());
        if let Some(sql) = oldest {
            self.entries.remove(&sql);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = StatementCache::new(2);
        cache.insert_if_absent("a".into(), 1);
        cache.insert_if_absent("b".into(), 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.insert_if_absent("c".into(), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn insert_keeps_existing_entry() {
        let mut cache = StatementCache::new(4);
        assert_eq!(cache.insert_if_absent("a".into(), 1), 1);
        assert_eq!(cache.insert_if_absent("a".into(), 9), 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut cache = StatementCache::new(0);
        assert_eq!(cache.insert_if_absent("a".into(), 1), 1);
        assert_eq!(cache.get("a"), None);
    }
}
