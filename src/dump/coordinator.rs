//! Extraction coordinator
//!
//! Discovers how many partitions and records a collection has, starts one
//! [`PartitionWalker`] per partition, and merges everything they emit into a
//! single output stream.
//!
//! The output stream closes when its last sender is dropped. Each walker
//! holds a clone that it drops on exit, and the coordinator's join task holds
//! the original until every walker has been joined. The stream therefore
//! closes exactly once and never before the last walker is done.

use super::walker::{PartitionWalker, Termination, WalkOutcome};
use super::{DumpRequest, WorkerPool};
use crate::client::SearchStore;
use crate::error::{DumpError, StoreError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Default number of serialized records buffered between walkers and the
/// consumer.
pub const DEFAULT_OUTPUT_BUFFER: usize = 256;

/// Delivered-versus-expected reconciliation, available once the output
/// stream has closed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DumpReport {
    /// Record count reported by the store before the walk started.
    pub expected: u64,
    /// Records actually pushed into the output stream.
    pub delivered: u64,
    pub partitions: u32,
    /// Partitions whose walk stopped early, in completion order.
    pub failed_partitions: Vec<u32>,
    /// Walker tasks that panicked.
    pub panicked: usize,
}

impl DumpReport {
    fn new(expected: u64, partitions: u32) -> Self {
        Self {
            expected,
            partitions,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: WalkOutcome) {
        self.delivered += outcome.emitted;
        if let Termination::Aborted(_) = outcome.termination {
            self.failed_partitions.push(outcome.partition);
        }
    }

    /// No partition failed and nothing went missing.
    pub fn is_complete(&self) -> bool {
        self.failed_partitions.is_empty() && self.panicked == 0 && self.delivered >= self.expected
    }
}

/// Resolves to the [`DumpReport`] once every walker has finished.
pub struct Completion {
    inner: CompletionInner,
}

enum CompletionInner {
    Ready(DumpReport),
    Joining {
        handle: JoinHandle<DumpReport>,
        expected: u64,
        partitions: u32,
    },
}

impl Completion {
    /// If the join task itself fails, the per-partition results are lost and
    /// the returned report is marked incomplete.
    pub async fn wait(self) -> DumpReport {
        match self.inner {
            CompletionInner::Ready(report) => report,
            CompletionInner::Joining {
                handle,
                expected,
                partitions,
            } => handle.await.unwrap_or_else(|e| {
                log::error!("Dump coordinator task failed: {}", e);
                DumpReport {
                    panicked: 1,
                    ..DumpReport::new(expected, partitions)
                }
            }),
        }
    }
}

/// Returned as soon as discovery succeeds, before any record is fetched.
pub struct DumpResult {
    /// Advisory total for progress display. Partition failures can make the
    /// number of delivered records smaller.
    pub expected: u64,
    /// Serialized records, closed after the last partition finishes.
    pub docs: mpsc::Receiver<String>,
    pub completion: Completion,
}

pub struct Dumper<S> {
    store: Arc<S>,
    pool: Arc<WorkerPool>,
    output_buffer: usize,
}

impl<S: SearchStore> Dumper<S> {
    pub fn new(store: Arc<S>, pool: Arc<WorkerPool>) -> Self {
        Self {
            store,
            pool,
            output_buffer: DEFAULT_OUTPUT_BUFFER,
        }
    }

    pub fn with_output_buffer(mut self, output_buffer: usize) -> Self {
        self.output_buffer = output_buffer.max(1);
        self
    }

    /// Start dumping `request.collection`.
    ///
    /// Discovery runs before this returns; the walk itself continues in the
    /// background and feeds [`DumpResult::docs`].
    ///
    /// # Errors
    /// Returns [`DumpError::Discovery`] if the partition or record count
    /// cannot be fetched, and [`DumpError::InvalidConfig`] for a bad request.
    /// In both cases no partition has been queried.
    pub async fn dump(&self, request: DumpRequest) -> Result<DumpResult, DumpError> {
        request.validate()?;

        let partitions = self
            .store
            .partition_count(&request.collection)
            .await
            .map_err(discovery_error(&request.collection, "partition count"))?;
        let expected = self
            .store
            .record_count(&request.collection)
            .await
            .map_err(discovery_error(&request.collection, "record count"))?;

        log::info!(
            "Collection {} has {} record(s) across {} partition(s)",
            request.collection,
            expected,
            partitions
        );

        let (tx, docs) = mpsc::channel(self.output_buffer);

        if expected == 0 {
            drop(tx);
            return Ok(DumpResult {
                expected,
                docs,
                completion: Completion {
                    inner: CompletionInner::Ready(DumpReport::new(expected, partitions)),
                },
            });
        }

        let request = Arc::new(request);
        let mut walkers = JoinSet::new();
        for partition in 0..partitions {
            let walker = PartitionWalker::new(
                Arc::clone(&self.store),
                Arc::clone(&self.pool),
                Arc::clone(&request),
                partition,
                tx.clone(),
            );
            walkers.spawn(walker.run());
        }
        log::debug!("Spawned {} partition walker(s)", partitions);

        let handle = tokio::spawn(async move {
            let mut report = DumpReport::new(expected, partitions);
            while let Some(joined) = walkers.join_next().await {
                match joined {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        log::error!("Partition walker failed: {}", e);
                        report.panicked += 1;
                    }
                }
            }
            // Last sender: the stream closes here and nowhere else
            drop(tx);
            report
        });

        Ok(DumpResult {
            expected,
            docs,
            completion: Completion {
                inner: CompletionInner::Joining {
                    handle,
                    expected,
                    partitions,
                },
            },
        })
    }
}

fn discovery_error(collection: &str, what: &'static str) -> impl FnOnce(StoreError) -> DumpError {
    let collection = collection.to_string();
    move |source| DumpError::Discovery {
        collection,
        what,
        source,
    }
}
