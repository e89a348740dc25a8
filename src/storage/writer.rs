//! Streaming NDJSON writer
//!
//! Records are handed over through a bounded queue and written by a
//! dedicated blocking task, so slow disk I/O never stalls the network side
//! until the queue fills up.

use super::ByteSink;
use crate::error::DumpError;
use std::io::{self, BufWriter, Write};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_WRITER_BUFFER: usize = 1024;

/// Totals reported when the writer is closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub written: u64,
    pub failed: u64,
}

/// Appends serialized records, one per line, to a [`ByteSink`].
///
/// # Example
/// ```no_run
/// use es_dump::storage::{DumpWriter, open_sink};
///
/// # async fn example() -> eyre::Result<()> {
/// let writer = DumpWriter::new(open_sink("logs.json", false)?, 1024);
/// writer.append(r#"{"message":"hello"}"#.to_string()).await?;
/// let stats = writer.close().await?;
/// assert_eq!(stats.written, 1);
/// # Ok(())
/// # }
/// ```
pub struct DumpWriter {
    docs: mpsc::Sender<String>,
    task: JoinHandle<Result<WriteStats, DumpError>>,
}

impl DumpWriter {
    /// Take ownership of `sink` and start the writer task. Must be called
    /// from within a tokio runtime.
    pub fn new(sink: Box<dyn ByteSink>, buffer: usize) -> Self {
        let (docs, rx) = mpsc::channel(buffer.max(1));
        let task = tokio::task::spawn_blocking(move || drain(sink, rx));
        Self { docs, task }
    }

    /// Queue one record, waiting if the queue is full.
    pub async fn append(&self, doc: String) -> Result<(), DumpError> {
        self.docs.send(doc).await.map_err(|_| DumpError::OutputClosed)
    }

    /// Write out everything queued, flush, and close the sink.
    ///
    /// # Errors
    /// Individual record failures are only counted in [`WriteStats::failed`].
    /// This fails only if the final flush or close of the sink fails.
    pub async fn close(self) -> Result<WriteStats, DumpError> {
        let Self { docs, task } = self;
        drop(docs);
        match task.await {
            Ok(result) => result,
            Err(e) => Err(DumpError::SinkWrite(io::Error::other(e))),
        }
    }
}

fn drain(sink: Box<dyn ByteSink>, mut rx: mpsc::Receiver<String>) -> Result<WriteStats, DumpError> {
    let mut writer = BufWriter::new(sink);
    let mut stats = WriteStats::default();

    while let Some(doc) = rx.blocking_recv() {
        match write_record(&mut writer, &doc) {
            Ok(()) => stats.written += 1,
            Err(e) => {
                stats.failed += 1;
                log::error!("{}", DumpError::SinkWrite(e));
            }
        }
    }

    // On error the sink is dropped here, which still releases it
    let sink = writer.into_inner().map_err(|e| e.into_error())?;
    sink.finish()?;

    log::debug!(
        "Writer finished: {} written, {} failed",
        stats.written,
        stats.failed
    );
    Ok(stats)
}

fn write_record(writer: &mut impl Write, doc: &str) -> io::Result<()> {
    writer.write_all(doc.as_bytes())?;
    writer.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_sink;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Sink that rejects writes containing a marker and records the rest.
    struct PickySink {
        written: Arc<Mutex<Vec<u8>>>,
        finished: Arc<Mutex<bool>>,
    }

    impl Write for PickySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.windows(3).any(|w| w == b"BAD") {
                return Err(io::Error::other("rejected"));
            }
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ByteSink for PickySink {
        fn finish(self: Box<Self>) -> io::Result<()> {
            *self.finished.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_writes_one_record_per_line_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs.json");
        let writer = DumpWriter::new(open_sink(&path, false).unwrap(), 2);

        for i in 0..10 {
            writer.append(format!("{{\"n\":{}}}", i)).await.unwrap();
        }
        let stats = writer.close().await.unwrap();

        assert_eq!(stats, WriteStats { written: 10, failed: 0 });
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "{\"n\":0}");
        assert_eq!(lines[9], "{\"n\":9}");
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_empty_dump_still_closes_sink() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(Mutex::new(false));
        let sink = PickySink {
            written: Arc::clone(&written),
            finished: Arc::clone(&finished),
        };
        let writer = DumpWriter::new(Box::new(sink), 4);

        let stats = writer.close().await.unwrap();
        assert_eq!(stats, WriteStats::default());
        assert!(*finished.lock().unwrap());
        assert!(written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_record_does_not_stop_drain() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let finished = Arc::new(Mutex::new(false));
        let sink = PickySink {
            written: Arc::clone(&written),
            finished: Arc::clone(&finished),
        };
        // Records larger than the BufWriter capacity go straight to the sink
        let big = |tag: &str| format!("{}{}", tag, "x".repeat(16 * 1024));
        let writer = DumpWriter::new(Box::new(sink), 4);

        writer.append(big("ok1")).await.unwrap();
        writer.append(big("BAD")).await.unwrap();
        writer.append(big("ok2")).await.unwrap();
        let stats = writer.close().await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 2);
        assert!(*finished.lock().unwrap());
        let content = String::from_utf8(written.lock().unwrap().clone()).unwrap();
        assert!(content.contains("ok1"));
        assert!(content.contains("ok2"));
        assert!(!content.contains("BAD"));
    }
}
