//! Partition cursor walker
//!
//! Drains a single partition: open a cursor pinned to it, then keep
//! continuing that cursor until the store hands back an empty page. Every
//! store call goes through the shared [`WorkerPool`], so the number of
//! walkers never dictates the number of concurrent requests.
//!
//! ```text
//! Start -> FetchingFirstPage -> Streaming -> FetchingNextPage -> Streaming ...
//!                 |                                 |
//!                 +-- empty page --> Done <---------+
//!                 +-- error -------> Aborted <------+
//! ```

use super::{DumpRequest, WorkerPool};
use crate::client::{Page, SearchStore};
use crate::error::{DumpError, StoreError};
use std::sync::Arc;
use tokio::sync::mpsc;

/// How a walker finished.
#[derive(Debug)]
pub enum Termination {
    /// The partition was drained.
    Done,
    /// The walk stopped early; the rest of the partition was skipped.
    Aborted(DumpError),
}

#[derive(Debug)]
pub struct WalkOutcome {
    pub partition: u32,
    /// Records pushed into the output stream.
    pub emitted: u64,
    pub termination: Termination,
}

impl WalkOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self.termination, Termination::Aborted(_))
    }
}

/// Walks one partition and pushes its records into the shared output stream.
///
/// The walker owns its cursor token outright; nothing else ever sees it.
pub struct PartitionWalker<S> {
    store: Arc<S>,
    pool: Arc<WorkerPool>,
    request: Arc<DumpRequest>,
    partition: u32,
    output: mpsc::Sender<String>,
}

impl<S: SearchStore> PartitionWalker<S> {
    pub fn new(
        store: Arc<S>,
        pool: Arc<WorkerPool>,
        request: Arc<DumpRequest>,
        partition: u32,
        output: mpsc::Sender<String>,
    ) -> Self {
        Self {
            store,
            pool,
            request,
            partition,
            output,
        }
    }

    /// Walk the partition to the end. Never fails: errors end the walk and
    /// are reported in the returned outcome.
    pub async fn run(self) -> WalkOutcome {
        let mut emitted = 0u64;
        let mut cursor: Option<String> = None;

        let termination = 'walk: loop {
            let page = match cursor.clone() {
                None => self.fetch_first().await,
                Some(token) => self.fetch_next(token).await,
            };
            let page = match page {
                Ok(page) => page,
                Err(error) => {
                    log::error!("Partition {} aborted: {}", self.partition, error);
                    break Termination::Aborted(error);
                }
            };

            // The store may rotate the token on any page. A page without one
            // is the last; the previous token is kept only for release.
            let last_page = page.cursor.is_none();
            let empty = page.is_empty();
            if !last_page {
                cursor = page.cursor;
            }
            if empty {
                break Termination::Done;
            }

            for record in page.records {
                if self.output.send(record).await.is_err() {
                    log::warn!(
                        "Output stream closed, abandoning partition {}",
                        self.partition
                    );
                    break 'walk Termination::Aborted(DumpError::OutputClosed);
                }
                emitted += 1;
            }

            if last_page {
                log::warn!(
                    "Partition {} returned records without a cursor, stopping",
                    self.partition
                );
                break Termination::Done;
            }
        };

        if let Some(token) = cursor {
            self.release(token).await;
        }

        log::debug!(
            "Partition {} finished with {} record(s)",
            self.partition,
            emitted
        );

        WalkOutcome {
            partition: self.partition,
            emitted,
            termination,
        }
    }

    async fn fetch_first(&self) -> Result<Page, DumpError> {
        let store = Arc::clone(&self.store);
        let query = self.request.cursor_query(self.partition);
        let handle = self
            .pool
            .submit(async move { store.open_cursor(&query).await })
            .await?;
        self.page_result(handle.wait().await?)
    }

    async fn fetch_next(&self, token: String) -> Result<Page, DumpError> {
        let store = Arc::clone(&self.store);
        let lease = self.request.lease;
        let handle = self
            .pool
            .submit(async move { store.continue_cursor(&token, lease).await })
            .await?;
        self.page_result(handle.wait().await?)
    }

    fn page_result(&self, result: Result<Page, StoreError>) -> Result<Page, DumpError> {
        result.map_err(|source| DumpError::PageFetch {
            partition: self.partition,
            source,
        })
    }

    /// Best effort: the lease expires on its own if this fails.
    async fn release(&self, token: String) {
        if let Err(e) = self.try_release(token).await {
            log::debug!(
                "Failed to release cursor of partition {}: {}",
                self.partition,
                e
            );
        }
    }

    async fn try_release(&self, token: String) -> Result<(), DumpError> {
        let store = Arc::clone(&self.store);
        let handle = self
            .pool
            .submit(async move { store.release_cursor(&token).await })
            .await?;
        handle.wait().await?.map_err(|source| DumpError::PageFetch {
            partition: self.partition,
            source,
        })
    }
}
