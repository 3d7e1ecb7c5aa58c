//! Pull-based result paging.
//!
//! [`QueryPager`] turns a base query into a lazy sequence of pages pulled
//! on demand. Every page fetch is one scoped executor invocation with
//! `LIMIT ? OFFSET ?` appended, so no cursor or connection survives
//! between pulls and abandoning the pager leaks nothing. A short page
//! ends the sequence; a new pager restarts from offset zero.
//!
//! The base query must not carry its own LIMIT/OFFSET clause.

use std::collections::VecDeque;

use crate::error::Result;
use crate::executor::fetch_one;
use crate::query::{Query, ResultSet, Row, Value};
use crate::store::Store;

/// Lazily pages through the results of one query.
pub struct QueryPager<'a, S: Store> {
    store: &'a S,
    query: Query,
    page_size: u32,
    offset: u64,
    done: bool,
    buffer: VecDeque<Row>,
}

impl<'a, S: Store> QueryPager<'a, S> {
    pub fn new(store: &'a S, query: Query, page_size: u32) -> Self {
        Self {
            store,
            query,
            page_size: page_size.max(1),
            offset: 0,
            done: false,
            buffer: VecDeque::new(),
        }
    }

    /// Fetch the next page, or `None` once the results are exhausted.
    pub async fn next_page(&mut self) -> Result<Option<ResultSet>> {
        if self.done {
            return Ok(None);
        }

        let mut params = self.query.params().to_vec();
        params.push(Value::Integer(self.page_size.into()));
        params.push(Value::Integer(self.offset as i64));
        let paged = Query::with_params(format!("{} LIMIT ? OFFSET ?", self.query.sql()), params);

        let rows = fetch_one(self.store, &paged).await?;
        if rows.len() < self.page_size as usize {
            self.done = true;
        }
        if rows.is_empty() {
            return Ok(None);
        }

        self.offset += rows.len() as u64;
        Ok(Some(rows))
    }

    /// Yield the next row, pulling a fresh page when the buffer runs dry.
    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.buffer.is_empty() {
            if let Some(page) = self.next_page().await? {
                self.buffer.extend(page);
            }
        }
        Ok(self.buffer.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::store::StoreConnection;

    /// Store double serving slices of a fixed row list; the last two
    /// bound parameters are interpreted as LIMIT and OFFSET.
    struct PagedStore {
        rows: Vec<Row>,
    }

    struct PagedConn {
        rows: Vec<Row>,
    }

    #[async_trait]
    impl Store for PagedStore {
        type Conn = PagedConn;

        async fn connect(&self) -> Result<PagedConn> {
            Ok(PagedConn {
                rows: self.rows.clone(),
            })
        }

        fn describe(&self) -> String {
            "paged".to_string()
        }
    }

    #[async_trait]
    impl StoreConnection for PagedConn {
        async fn fetch_all(&mut self, query: &Query) -> Result<ResultSet> {
            let params = query.params();
            let limit = params[params.len() - 2].as_integer().unwrap() as usize;
            let offset = params[params.len() - 1].as_integer().unwrap() as usize;
            Ok(self
                .rows
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn close(self) -> Result<()> {
            Ok(())
        }
    }

    fn store_with(n: i64) -> PagedStore {
        PagedStore {
            rows: (0..n).map(|i| Row(vec![Value::Integer(i)])).collect(),
        }
    }

    #[tokio::test]
    async fn pages_have_requested_size_and_short_page_terminates() {
        let store = store_with(7);
        let mut pager = QueryPager::new(&store, Query::new("SELECT * FROM t"), 3);

        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 3);
        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 3);
        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 1);
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exact_multiple_ends_on_empty_page() {
        let store = store_with(6);
        let mut pager = QueryPager::new(&store, Query::new("SELECT * FROM t"), 3);

        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 3);
        assert_eq!(pager.next_page().await.unwrap().unwrap().len(), 3);
        assert!(pager.next_page().await.unwrap().is_none());
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn row_iteration_crosses_page_boundaries() {
        let store = store_with(5);
        let mut pager = QueryPager::new(&store, Query::new("SELECT * FROM t"), 2);

        let mut seen = Vec::new();
        while let Some(row) = pager.next_row().await.unwrap() {
            seen.push(row.get(0).unwrap().as_integer().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
