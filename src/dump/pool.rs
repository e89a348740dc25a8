//! Bounded worker pool for remote calls
//!
//! A fixed number of workers pull jobs from a bounded queue and run each one
//! to completion before taking the next. At most `workers` jobs are in flight
//! and at most `queue_capacity` more are waiting; any further `submit` waits
//! for a slot. That queue is the only admission control between the
//! partition walkers and the store.

use crate::error::DumpError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Worker pool sizing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Deadline applied to every job. `None` lets jobs run as long as the
    /// remote call does.
    pub job_timeout: Option<Duration>,
}

impl PoolConfig {
    /// `workers` workers and an equally sized queue, no deadline.
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: workers,
            job_timeout: None,
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_job_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout;
        self
    }
}

/// Result of one submitted job. Read it exactly once with [`JobHandle::wait`].
#[must_use = "a job's result must be awaited"]
pub struct JobHandle<T> {
    rx: oneshot::Receiver<Result<T, DumpError>>,
}

impl<T> JobHandle<T> {
    /// Wait for the job to finish.
    ///
    /// # Errors
    /// - [`DumpError::JobTimeout`] if the pool deadline expired first
    /// - [`DumpError::JobDropped`] if the job panicked or was discarded
    pub async fn wait(self) -> Result<T, DumpError> {
        self.rx.await.unwrap_or(Err(DumpError::JobDropped))
    }
}

pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    job_timeout: Option<Duration>,
}

impl WorkerPool {
    /// Start the workers. Must be called from within a tokio runtime.
    pub fn new(config: &PoolConfig) -> Result<Self, DumpError> {
        if config.workers == 0 {
            return Err(DumpError::InvalidConfig(
                "worker pool needs at least one worker".to_string(),
            ));
        }
        if config.queue_capacity == 0 {
            return Err(DumpError::InvalidConfig(
                "worker pool queue capacity must be at least 1".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::channel::<Job>(config.queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let workers = (0..config.workers)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&receiver))))
            .collect();

        log::debug!(
            "Started worker pool with {} worker(s), queue capacity {}",
            config.workers,
            config.queue_capacity
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            worker_count: config.workers,
            job_timeout: config.job_timeout,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Queue a job, waiting for a free slot if the queue is full.
    ///
    /// # Errors
    /// Returns [`DumpError::PoolClosed`] once [`close`](Self::close) has been
    /// called.
    pub async fn submit<F, T>(&self, job: F) -> Result<JobHandle<T>, DumpError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(DumpError::PoolClosed)?;

        let (tx, rx) = oneshot::channel();
        let deadline = self.job_timeout;
        let job: Job = Box::pin(async move {
            let result = match deadline {
                Some(deadline) => tokio::time::timeout(deadline, job)
                    .await
                    .map_err(|_| DumpError::JobTimeout(deadline)),
                None => Ok(job.await),
            };
            // Submitter may have stopped listening
            let _ = tx.send(result);
        });

        sender.send(job).await.map_err(|_| DumpError::PoolClosed)?;
        Ok(JobHandle { rx })
    }

    /// Stop accepting jobs, let queued and in-flight jobs finish, and join
    /// every worker. Calling it again is a no-op.
    pub async fn close(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            if let Err(e) = worker.await {
                log::error!("Worker pool task failed: {}", e);
            }
        }
        log::debug!("Worker pool closed");
    }
}

async fn run_worker(id: usize, jobs: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        // A panicking job must not take the worker down with it
        if let Err(e) = tokio::spawn(job).await {
            log::error!("Job on worker {} panicked: {}", id, e);
        }
    }
    log::trace!("Worker {} stopped", id);
}
