//! Scoped single-query execution.
//!
//! [`fetch_one`] is the leaf operation of the crate: open a connection,
//! run one query, materialize the rows, release the connection. The
//! release happens on every exit path - success, query failure, or the
//! caller dropping the future mid-await (connections release on drop).

use std::time::Instant;

use tracing::{debug, trace};

use crate::error::{FetchError, Result};
use crate::query::{Query, ResultSet};
use crate::store::{Store, StoreConnection};

/// Run one query over a connection whose lifetime is exactly this call.
///
/// The result set is fully materialized before the connection closes, so
/// nothing the caller holds depends on a live cursor.
///
/// # Errors
///
/// - [`FetchError::EmptyQuery`] if the query text is empty; no connection
///   is opened.
/// - [`FetchError::Connection`] if the session could not be established.
/// - [`FetchError::Query`] if the store failed the query. The connection
///   is still released; a secondary release failure is logged and the
///   query error takes precedence.
/// - [`FetchError::Release`] if the query succeeded but the session could
///   not be released cleanly.
pub async fn fetch_one<S: Store>(store: &S, query: &Query) -> Result<ResultSet> {
    if query.sql().trim().is_empty() {
        return Err(FetchError::EmptyQuery);
    }

    let started = Instant::now();
    let mut conn = store.connect().await?;
    trace!(store = %store.describe(), query = %query, "connection opened");

    let fetched = conn.fetch_all(query).await;
    match fetched {
        Ok(rows) => {
            conn.close().await?;
            debug!(
                query = %query,
                rows = rows.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "query complete"
            );
            Ok(rows)
        }
        Err(err) => {
            if let Err(release_err) = conn.close().await {
                // Query error takes precedence over teardown noise.
                debug!(query = %query, error = %release_err, "release failed after query error");
            }
            Err(err)
        }
    }
}
