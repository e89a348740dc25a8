//! File system storage operations
//!
//! This module handles the dump output:
//! - Plain or gzip-compressed output files
//! - The streaming NDJSON writer that drains extracted records to disk

mod sink;
mod writer;

pub use sink::{ByteSink, open_sink, output_path};
pub use writer::{DEFAULT_WRITER_BUFFER, DumpWriter, WriteStats};
