//! Remote store contract used by the dump core
//!
//! The core only talks to a [`SearchStore`]. Implementations are responsible
//! for decoding wire responses into the typed [`Page`] values below, so no
//! untyped JSON ever crosses this boundary.

use crate::error::StoreError;
use std::future::Future;
use std::time::Duration;

/// Sort order that walks a partition in index order, the cheapest for scrolls.
pub const INDEX_ORDER: &str = "_doc";

/// Parameters for opening a partition-pinned paging cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorQuery {
    pub collection: String,
    pub record_type: String,
    pub partition: u32,
    pub page_size: u32,
    pub sort: &'static str,
    pub lease: Duration,
}

/// One page of a cursor walk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    /// Serialized records in the order the store returned them.
    pub records: Vec<String>,
    /// Token for the next page, if the store handed one out.
    pub cursor: Option<String>,
}

impl Page {
    pub fn new(records: Vec<String>, cursor: impl Into<String>) -> Self {
        Self {
            records,
            cursor: Some(cursor.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A distributed search store that can be drained partition by partition.
///
/// All methods may fail with a [`StoreError`]; callers treat every failure
/// uniformly.
pub trait SearchStore: Send + Sync + 'static {
    /// Number of partitions (shards) backing `collection`.
    fn partition_count(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// Total number of records in `collection`.
    fn record_count(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Open a cursor pinned to one partition and fetch its first page.
    fn open_cursor(
        &self,
        query: &CursorQuery,
    ) -> impl Future<Output = Result<Page, StoreError>> + Send;

    /// Fetch the next page of an open cursor, renewing its lease.
    fn continue_cursor(
        &self,
        cursor: &str,
        lease: Duration,
    ) -> impl Future<Output = Result<Page, StoreError>> + Send;

    /// Release server-side cursor state. Stores that expire cursors on their
    /// own can keep the default.
    fn release_cursor(
        &self,
        _cursor: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async { Ok(()) }
    }
}
