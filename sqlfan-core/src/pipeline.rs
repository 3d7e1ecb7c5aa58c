//! Explicit stage composition around the core executor.
//!
//! The cross-cutting concerns this tool supports - result caching, retry
//! on transient failure, query logging - compose in one fixed order
//! rather than by nesting wrappers, because wrapper order changes
//! semantics silently. The order here is part of the contract:
//!
//! 1. cache lookup (a hit never consults the store)
//! 2. retry loop (each attempt is a full acquire/execute/release cycle)
//! 3. logged execute ([`fetch_one`])
//!
//! Errors are never cached, and a successful fetch populates the cache
//! after the retry loop resolves.

use std::time::Duration;

use tracing::{info, warn};

use crate::cache::QueryCache;
use crate::error::Result;
use crate::executor::fetch_one;
use crate::query::{Query, ResultSet};
use crate::store::Store;

/// Retry bound for transient store failures: at most `attempts` total
/// tries with a fixed `delay` between them.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// A fetch with optional cache and retry stages around it.
pub struct FetchPipeline<'a> {
    cache: Option<&'a QueryCache>,
    retry: Option<RetryPolicy>,
}

impl<'a> FetchPipeline<'a> {
    pub fn new() -> Self {
        Self {
            cache: None,
            retry: None,
        }
    }

    /// Memoize successful results in `cache`.
    pub fn with_cache(mut self, cache: &'a QueryCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Re-run failed fetches under `policy`.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Run `query` through the configured stages.
    pub async fn fetch<S: Store>(&self, store: &S, query: &Query) -> Result<ResultSet> {
        if let Some(cache) = self.cache {
            if let Some(rows) = cache.get(query) {
                info!(query = %query, "serving cached result");
                return Ok(rows);
            }
        }

        let rows = match &self.retry {
            Some(policy) => fetch_with_retry(store, query, policy).await?,
            None => fetch_one(store, query).await?,
        };

        if let Some(cache) = self.cache {
            cache.insert(query, rows.clone());
        }
        Ok(rows)
    }
}

impl Default for FetchPipeline<'_> {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_with_retry<S: Store>(
    store: &S,
    query: &Query,
    policy: &RetryPolicy,
) -> Result<ResultSet> {
    let attempts = policy.attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match fetch_one(store, query).await {
            Ok(rows) => return Ok(rows),
            Err(err) => {
                if attempt < attempts {
                    warn!(
                        query = %query,
                        attempt,
                        error = %err,
                        "fetch failed, retrying in {:?}",
                        policy.delay
                    );
                    tokio::time::sleep(policy.delay).await;
                } else {
                    warn!(query = %query, attempts, error = %err, "all attempts failed");
                }
                last_err = Some(err);
            }
        }
    }

    // attempts >= 1, so last_err is set when every try failed
    Err(last_err.expect("retry loop ran at least once"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::FetchError;
    use crate::query::{Row, Value};
    use crate::store::StoreConnection;

    /// Store double that fails the first `failures` fetches, counting
    /// every attempt.
    struct FlakyStore {
        failures: usize,
        attempts: Arc<AtomicUsize>,
    }

    struct FlakyConn {
        fail: bool,
    }

    #[async_trait]
    impl Store for FlakyStore {
        type Conn = FlakyConn;

        async fn connect(&self) -> Result<FlakyConn> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(FlakyConn {
                fail: n < self.failures,
            })
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[async_trait]
    impl StoreConnection for FlakyConn {
        async fn fetch_all(&mut self, query: &Query) -> Result<ResultSet> {
            if self.fail {
                return Err(FetchError::query(query.sql(), "transient failure"));
            }
            Ok(vec![Row(vec![Value::Integer(7)])])
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    fn flaky(failures: usize) -> (FlakyStore, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            FlakyStore {
                failures,
                attempts: Arc::clone(&attempts),
            },
            attempts,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_from_transient_failures() {
        let (store, attempts) = flaky(2);
        let pipeline = FetchPipeline::new().with_retry(RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(100),
        });

        let rows = pipeline
            .fetch(&store, &Query::new("SELECT 7"))
            .await
            .unwrap();

        assert_eq!(rows, vec![Row(vec![Value::Integer(7)])]);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_stops_at_policy_bound() {
        let (store, attempts) = flaky(10);
        let pipeline = FetchPipeline::new().with_retry(RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(100),
        });

        let err = pipeline
            .fetch(&store, &Query::new("SELECT 7"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Query { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cache_short_circuits_second_fetch() {
        let (store, attempts) = flaky(0);
        let cache = QueryCache::new(Duration::from_secs(60));
        let pipeline = FetchPipeline::new().with_cache(&cache);
        let query = Query::new("SELECT 7");

        let first = pipeline.fetch(&store, &query).await.unwrap();
        let second = pipeline.fetch(&store, &query).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (store, attempts) = flaky(1);
        let cache = QueryCache::new(Duration::from_secs(60));
        let pipeline = FetchPipeline::new().with_cache(&cache);
        let query = Query::new("SELECT 7");

        assert!(pipeline.fetch(&store, &query).await.is_err());
        assert!(cache.is_empty());

        // A later fetch hits the store again and caches the success.
        assert!(pipeline.fetch(&store, &query).await.is_ok());
        assert_eq!(cache.len(), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
