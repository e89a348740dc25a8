use crate::client::{CursorQuery, INDEX_ORDER};
use crate::error::DumpError;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// What to extract and how hard to push the store while doing it.
///
/// Built once at startup and shared read-only by every partition walker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpRequest {
    pub collection: String,
    pub record_type: String,
    pub page_size: u32,
    pub concurrency: usize,
    pub lease: Duration,
}

impl DumpRequest {
    pub fn new(collection: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            record_type: record_type.into(),
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            lease: DEFAULT_LEASE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn validate(&self) -> Result<(), DumpError> {
        if self.collection.trim().is_empty() {
            return Err(DumpError::InvalidConfig(
                "collection must not be empty".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(DumpError::InvalidConfig(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(DumpError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// First-page query for one partition.
    pub fn cursor_query(&self, partition: u32) -> CursorQuery {
        CursorQuery {
            collection: self.collection.clone(),
            record_type: self.record_type.clone(),
            partition,
            page_size: self.page_size,
            sort: INDEX_ORDER,
            lease: self.lease,
        }
    }
}
