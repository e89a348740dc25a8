//! Error types for the dump pipeline
//!
//! Only [`DumpError::Discovery`] ever reaches the caller of
//! [`Dumper::dump`](crate::dump::Dumper::dump). Every other variant is
//! contained by the component that detected it and surfaces through logs and
//! the final [`DumpReport`](crate::dump::DumpReport).

use std::time::Duration;
use thiserror::Error;

/// A single call to the remote store failed.
///
/// The dump core treats every variant the same way: "this call failed".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum DumpError {
    /// Partition count or total count query failed. Fatal.
    #[error("failed to discover {what} for '{collection}': {source}")]
    Discovery {
        collection: String,
        what: &'static str,
        #[source]
        source: StoreError,
    },

    /// A first-page or continuation call failed. Isolated to one partition.
    #[error("failed to query partition {partition}: {source}")]
    PageFetch {
        partition: u32,
        #[source]
        source: StoreError,
    },

    /// Serializing or writing a single record to the sink failed.
    #[error("failed to write record: {0}")]
    SinkWrite(#[from] std::io::Error),

    #[error("worker pool is closed")]
    PoolClosed,

    #[error("job exceeded its {0:?} deadline")]
    JobTimeout(Duration),

    #[error("job finished without producing a result")]
    JobDropped,

    #[error("output stream was closed by its consumer")]
    OutputClosed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
