//! Scripted in-memory store for unit tests

use crate::client::{CursorQuery, Page, SearchStore};
use crate::error::StoreError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Script = VecDeque<Result<Vec<&'static str>, &'static str>>;

/// Serves pre-recorded pages per partition. Cursor tokens look like
/// `p{partition}-c{page}` so continuations find their partition again.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    partitions: u32,
    total: Option<u64>,
    fail_partition_count: bool,
    fail_record_count: bool,
    scripts: Mutex<HashMap<u32, Script>>,
    served: Mutex<HashMap<u32, usize>>,
    delays: HashMap<u32, Duration>,
    cursorless_from: HashMap<u32, usize>,
    leases: Mutex<Vec<Duration>>,
    opened: Mutex<Vec<u32>>,
    continuations: AtomicUsize,
    released: Mutex<Vec<String>>,
}

impl ScriptedStore {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions,
            ..Default::default()
        }
    }

    pub fn partition(self, partition: u32, pages: Vec<Result<Vec<&'static str>, &'static str>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(partition, pages.into_iter().collect());
        self
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn delay(mut self, partition: u32, delay: Duration) -> Self {
        self.delays.insert(partition, delay);
        self
    }

    /// Pages of `partition` from index `page` onwards carry no cursor token.
    pub fn drop_cursor_from(mut self, partition: u32, page: usize) -> Self {
        self.cursorless_from.insert(partition, page);
        self
    }

    pub fn fail_partition_count(mut self) -> Self {
        self.fail_partition_count = true;
        self
    }

    pub fn fail_record_count(mut self) -> Self {
        self.fail_record_count = true;
        self
    }

    /// Partitions that had a cursor opened, in call order.
    pub fn opened(&self) -> Vec<u32> {
        self.opened.lock().unwrap().clone()
    }

    pub fn continuations(&self) -> usize {
        self.continuations.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    /// Lease passed to every continuation, in call order.
    pub fn leases(&self) -> Vec<Duration> {
        self.leases.lock().unwrap().clone()
    }

    async fn next_page(&self, partition: u32) -> Result<Page, StoreError> {
        if let Some(delay) = self.delays.get(&partition) {
            tokio::time::sleep(*delay).await;
        }
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&partition)
            .and_then(|script| script.pop_front())
            .unwrap_or(Ok(vec![]));
        let index = {
            let mut served = self.served.lock().unwrap();
            let count = served.entry(partition).or_insert(0);
            *count += 1;
            *count - 1
        };
        let records: Vec<String> = match step {
            Ok(records) => records.into_iter().map(String::from).collect(),
            Err(message) => return Err(StoreError::Other(message.to_string())),
        };
        match self.cursorless_from.get(&partition) {
            Some(&from) if index >= from => Ok(Page {
                records,
                cursor: None,
            }),
            _ => Ok(Page::new(records, format!("p{}-c{}", partition, index))),
        }
    }
}

impl SearchStore for ScriptedStore {
    async fn partition_count(&self, _collection: &str) -> Result<u32, StoreError> {
        if self.fail_partition_count {
            return Err(StoreError::Other("search_shards failed".to_string()));
        }
        Ok(self.partitions)
    }

    async fn record_count(&self, _collection: &str) -> Result<u64, StoreError> {
        if self.fail_record_count {
            return Err(StoreError::Other("count failed".to_string()));
        }
        let total = self.total.unwrap_or_else(|| {
            self.scripts
                .lock()
                .unwrap()
                .values()
                .flatten()
                .filter_map(|step| step.as_ref().ok())
                .map(|records| records.len() as u64)
                .sum()
        });
        Ok(total)
    }

    async fn open_cursor(&self, query: &CursorQuery) -> Result<Page, StoreError> {
        self.opened.lock().unwrap().push(query.partition);
        self.next_page(query.partition).await
    }

    async fn continue_cursor(&self, cursor: &str, lease: Duration) -> Result<Page, StoreError> {
        self.continuations.fetch_add(1, Ordering::SeqCst);
        self.leases.lock().unwrap().push(lease);
        let partition = cursor
            .strip_prefix('p')
            .and_then(|rest| rest.split_once('-'))
            .and_then(|(partition, _)| partition.parse().ok())
            .ok_or_else(|| StoreError::Other(format!("unknown cursor {}", cursor)))?;
        self.next_page(partition).await
    }

    async fn release_cursor(&self, cursor: &str) -> Result<(), StoreError> {
        self.released.lock().unwrap().push(cursor.to_string());
        Ok(())
    }
}
