//! Concurrent extraction pipeline
//!
//! Two levels of concurrency: one lightweight [`PartitionWalker`] task per
//! partition, all funnelled through a single bounded [`WorkerPool`] that caps
//! how many store requests are in flight at once. The [`Dumper`] wires them
//! together and merges the walkers' output into one stream.

mod coordinator;
mod pool;
mod request;
mod walker;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{Completion, DEFAULT_OUTPUT_BUFFER, DumpReport, DumpResult, Dumper};
pub use pool::{JobHandle, PoolConfig, WorkerPool};
pub use request::{DEFAULT_CONCURRENCY, DEFAULT_LEASE, DEFAULT_PAGE_SIZE, DumpRequest};
pub use walker::{PartitionWalker, Termination, WalkOutcome};
