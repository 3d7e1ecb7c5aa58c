//! Concurrent fan-out/join over independent queries.
//!
//! Each query runs as its own task with its own connection; the join
//! suspends the caller until every task settles. Results come back in
//! input order, never completion order.
//!
//! Failure policy: fail fast. The join resolves with the first task error
//! and drops the remaining futures; their connections release on drop.
//! With an opt-in deadline ([`FetchOptions::timeout`]) the same
//! cancellation path applies to the whole join.

use std::time::Duration;

use futures::future;
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::executor::fetch_one;
use crate::query::{Query, ResultSet};
use crate::store::Store;

/// Options for a concurrent fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Deadline for the whole join. `None` means wait indefinitely.
    pub timeout: Option<Duration>,
}

/// Run every query concurrently against `store` and return their result
/// sets in input order.
///
/// All-or-nothing: if any task fails, the first failure is returned as a
/// [`FetchError::Join`] naming the failing slot, and no partial list is
/// produced. Tasks still in flight at that point are cancelled and their
/// connections released.
pub async fn fetch_concurrently<S: Store>(store: &S, queries: &[Query]) -> Result<Vec<ResultSet>> {
    fetch_concurrently_with(store, queries, FetchOptions::default()).await
}

/// [`fetch_concurrently`] with an optional deadline.
///
/// When the deadline elapses before the join settles, every in-flight
/// task is cancelled, connections are released, and
/// [`FetchError::Timeout`] is returned.
pub async fn fetch_concurrently_with<S: Store>(
    store: &S,
    queries: &[Query],
    options: FetchOptions,
) -> Result<Vec<ResultSet>> {
    let tasks = queries.iter().enumerate().map(|(slot, query)| async move {
        fetch_one(store, query)
            .await
            .map_err(|err| FetchError::join(slot, query.sql(), err))
    });
    let joined = future::try_join_all(tasks);

    let results = match options.timeout {
        Some(deadline) => tokio::time::timeout(deadline, joined)
            .await
            .map_err(|_| FetchError::timeout(deadline))??,
        None => joined.await?,
    };

    debug!(queries = queries.len(), "concurrent fetch complete");
    Ok(results)
}
