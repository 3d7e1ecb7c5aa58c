/// Structured error types for sqlfan-core library.
///
/// Uses `thiserror` for better API surface and error composition.
/// The binary crate (sqlfan-cli) can still use `anyhow` for convenience,
/// but library consumers get structured, composable errors.

use std::time::Duration;

use thiserror::Error;

/// Main error type for sqlfan-core operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// A session to the data store could not be established
    #[error("could not open connection to {store}: {reason}")]
    Connection { store: String, reason: String },

    /// A session was established but could not be released cleanly
    #[error("could not release connection to {store}: {reason}")]
    Release { store: String, reason: String },

    /// The store rejected or failed to execute a query
    #[error("query failed ({sql}): {reason}")]
    Query { sql: String, reason: String },

    /// A concurrent fetch failed; identifies the first failing slot
    #[error("concurrent fetch failed at query {slot} ({sql}): {source}")]
    Join {
        slot: usize,
        sql: String,
        #[source]
        source: Box<FetchError>,
    },

    /// A concurrent fetch did not settle before its deadline
    #[error("concurrent fetch timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Query text was empty or whitespace-only
    #[error("query text is empty")]
    EmptyQuery,
}

/// Result type alias for sqlfan-core operations
pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Create a connection error
    pub fn connection(store: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            store: store.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a release error
    pub fn release(store: impl Into<String>, reason: impl ToString) -> Self {
        Self::Release {
            store: store.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a query execution error
    pub fn query(sql: impl Into<String>, reason: impl ToString) -> Self {
        Self::Query {
            sql: sql.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap a task error with its slot in the fan-out
    pub fn join(slot: usize, sql: impl Into<String>, source: FetchError) -> Self {
        Self::Join {
            slot,
            sql: sql.into(),
            source: Box::new(source),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::connection("users.db", "unable to open database file");
        assert_eq!(
            err.to_string(),
            "could not open connection to users.db: unable to open database file"
        );

        let err = FetchError::query("SELECT * FROM missing", "no such table: missing");
        assert!(err.to_string().contains("SELECT * FROM missing"));
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_join_wraps_source() {
        let inner = FetchError::query("SELECT 1", "boom");
        let err = FetchError::join(2, "SELECT 1", inner);

        assert!(err.to_string().contains("query 2"));
        assert!(matches!(err, FetchError::Join { slot: 2, .. }));

        let source = std::error::Error::source(&err).expect("join carries a source");
        assert!(source.to_string().contains("boom"));
    }
}
