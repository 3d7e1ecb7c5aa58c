//! Data-store seam.
//!
//! The executor and coordinator only know these two traits: a [`Store`]
//! hands out connections, a [`StoreConnection`] runs one parameterized
//! query and is released explicitly. Each connection is exclusively owned
//! by the executor invocation that opened it and lives for exactly one
//! query. Implementations must also release underlying resources on drop,
//! since a cancelled fetch drops its connection mid-flight.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::{Query, ResultSet};

/// A logical data store that can open independent sessions.
#[async_trait]
pub trait Store: Send + Sync {
    type Conn: StoreConnection;

    /// Open a fresh session. Sessions are never shared between tasks.
    async fn connect(&self) -> Result<Self::Conn>;

    /// Human-readable store identity, used in errors and logs.
    fn describe(&self) -> String;
}

/// One open session to a data store.
#[async_trait]
pub trait StoreConnection: Send {
    /// Execute a parameterized query and materialize every row.
    async fn fetch_all(&mut self, query: &Query) -> Result<ResultSet>;

    /// Release the session. Consumes the connection so a released handle
    /// cannot be reused.
    async fn close(self) -> Result<()>;
}
