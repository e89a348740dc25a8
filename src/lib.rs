//! Elasticsearch index dumper
//!
//! Drains every partition of a search index in parallel through a bounded
//! worker pool and streams the records to a local NDJSON file.

pub mod cli;
pub mod client;
pub mod dump;
pub mod error;
pub mod progress;
pub mod storage;

// Re-exports for convenience
pub use client::{Auth, CursorQuery, ElasticsearchClient, Page, SearchStore};
pub use dump::{DumpReport, DumpRequest, DumpResult, Dumper, PoolConfig, WorkerPool};
pub use error::{DumpError, StoreError};
pub use storage::{ByteSink, DumpWriter, WriteStats};
