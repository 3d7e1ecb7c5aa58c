//! Explicit query-result cache.
//!
//! Replaces the module-level cache dictionary idiom with an owned object
//! the caller passes by reference to whichever pipeline needs memoization.
//! Eviction policy: fixed TTL per cache; an entry older than the TTL is
//! treated as absent and dropped lazily by the access that observed it.
//! Inserts also sweep expired entries, so an idle cache does not grow
//! unbounded under a changing query mix.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::query::{Query, ResultSet};

struct Entry {
    rows: ResultSet,
    stored_at: Instant,
}

/// TTL-bounded cache of materialized result sets, keyed by query text and
/// bound parameters.
pub struct QueryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a fresh entry for `query`, evicting it if expired.
    pub fn get(&self, query: &Query) -> Option<ResultSet> {
        let key = query.cache_key();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.rows.clone()),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Store a result set for `query`, sweeping expired entries.
    pub fn insert(&self, query: &Query, rows: ResultSet) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            query.cache_key(),
            Entry {
                rows,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop any entry for `query`.
    pub fn invalidate(&self, query: &Query) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .remove(&query.cache_key());
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Row, Value};

    fn rows() -> ResultSet {
        vec![Row(vec![Value::Integer(1), Value::Text("Alice".into())])]
    }

    #[tokio::test(start_paused = true)]
    async fn hit_within_ttl_miss_after() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let query = Query::new("SELECT * FROM users");

        assert!(cache.get(&query).is_none());
        cache.insert(&query, rows());
        assert_eq!(cache.get(&query), Some(rows()));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(&query).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn insert_sweeps_expired_entries() {
        let cache = QueryCache::new(Duration::from_secs(10));
        cache.insert(&Query::new("SELECT 1"), rows());
        cache.insert(&Query::new("SELECT 2"), rows());

        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert(&Query::new("SELECT 3"), rows());

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn invalidate_is_per_query() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let a = Query::new("SELECT * FROM users WHERE age > ?").bind(40);
        let b = Query::new("SELECT * FROM users WHERE age > ?").bind(25);

        cache.insert(&a, rows());
        cache.insert(&b, rows());
        cache.invalidate(&a);

        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
    }
}
