pub mod cache;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod pager;
pub mod pipeline;
pub mod query;
pub mod sqlite;
pub mod store;

pub use cache::QueryCache;
pub use coordinator::{fetch_concurrently, fetch_concurrently_with, FetchOptions};
pub use error::{FetchError, Result};
pub use executor::fetch_one;
pub use pager::QueryPager;
pub use pipeline::{FetchPipeline, RetryPolicy};
pub use query::{Query, ResultSet, Row, Value};
pub use sqlite::{SqliteStore, SqliteStoreConnection};
pub use store::{Store, StoreConnection};
