//! In-memory [`DocumentStore`] used by unit tests.
//!
//! Views are seeded per key-filter value; write operations land in a plain
//! map. Failure injection covers failing keys, slow keys, aborted page
//! fetches and a missing view, plus in-flight accounting so tests can assert
//! the scheduler's concurrency bound.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{QueryError, Result, StoreWriteError};

use super::{DocumentStore, IndexQuery, PageEntry, PageFetch};

pub struct MemoryStore {
    /// Seeded view contents, keyed by key-filter value.
    views: BTreeMap<String, Vec<(String, String)>>,
    /// Current key/document state mutated by write operations.
    data: Mutex<BTreeMap<String, String>>,
    /// Keys whose write operations always fail.
    fail_keys: HashSet<String>,
    /// Keys whose write operations hang for `slow_delay` before completing.
    slow_keys: HashSet<String>,
    slow_delay: Duration,
    /// Delay applied to every write operation.
    op_delay: Duration,
    /// Key filters whose page fetches abort.
    fail_filters: HashSet<String>,
    /// Simulate a view that does not exist.
    missing_view: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            views: BTreeMap::new(),
            data: Mutex::new(BTreeMap::new()),
            fail_keys: HashSet::new(),
            slow_keys: HashSet::new(),
            slow_delay: Duration::from_secs(60),
            op_delay: Duration::ZERO,
            fail_filters: HashSet::new(),
            missing_view: false,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Seed one view key filter with (key, document) entries.
    pub fn with_view(mut self, filter: &str, entries: Vec<(&str, &str)>) -> Self {
        self.views.insert(
            filter.to_string(),
            entries
                .into_iter()
                .map(|(k, d)| (k.to_string(), d.to_string()))
                .collect(),
        );
        self
    }

    /// Seed the key/document state used by write operations.
    pub fn with_data(self, entries: Vec<(&str, &str)>) -> Self {
        {
            let mut data = self.data.lock().unwrap();
            for (k, d) in entries {
                data.insert(k.to_string(), d.to_string());
            }
        }
        self
    }

    pub fn with_fail_key(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    pub fn with_slow_key(mut self, key: &str, delay: Duration) -> Self {
        self.slow_keys.insert(key.to_string());
        self.slow_delay = delay;
        self
    }

    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    pub fn with_fail_filter(mut self, filter: &str) -> Self {
        self.fail_filters.insert(filter.to_string());
        self
    }

    pub fn with_missing_view(mut self) -> Self {
        self.missing_view = true;
        self
    }

    /// Highest number of write operations observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn document(&self, key: &str) -> Option<String> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    /// Wraps one write operation with delay and in-flight accounting.
    async fn operate<F>(&self, key: &str, op: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> Result<()>,
    {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.slow_keys.contains(key) {
            tokio::time::sleep(self.slow_delay).await;
        } else if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }

        let result = if self.fail_keys.contains(key) {
            Err(StoreWriteError::Failed {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            }
            .into())
        } else {
            op(&mut self.data.lock().unwrap())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_page(&self, query: &IndexQuery, resume: Option<&str>) -> Result<PageFetch> {
        if self.missing_view {
            return Err(QueryError::ViewNotFound(query.index.clone()).into());
        }
        if let Some(filter) = &query.key_filter {
            if self.fail_filters.contains(filter) {
                return Err(QueryError::Pagination("injected fetch abort".to_string()).into());
            }
        }

        // Key filter None traverses every seeded view in order.
        let all: Vec<(String, String)> = match &query.key_filter {
            Some(filter) => self.views.get(filter).cloned().unwrap_or_default(),
            None => self.views.values().flatten().cloned().collect(),
        };

        let start = match resume {
            Some(last) => all
                .iter()
                .position(|(k, _)| k == last)
                .map_or(all.len(), |p| p + 1),
            None => 0,
        };

        let entries: Vec<PageEntry> = all
            .iter()
            .skip(start)
            .take(query.page_size)
            .map(|(k, d)| PageEntry {
                key: k.clone(),
                document: if query.include_docs {
                    d.clone()
                } else {
                    String::new()
                },
            })
            .collect();

        let resume = if entries.len() == query.page_size {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(PageFetch { entries, resume })
    }

    async fn set(&self, key: &str, document: &str, _expiry: Option<u32>) -> Result<()> {
        let (key_owned, doc_owned) = (key.to_string(), document.to_string());
        self.operate(key, move |data| {
            data.insert(key_owned, doc_owned);
            Ok(())
        })
        .await
    }

    async fn add(&self, key: &str, document: &str, _expiry: Option<u32>) -> Result<()> {
        let (key_owned, doc_owned) = (key.to_string(), document.to_string());
        self.operate(key, move |data| {
            if data.contains_key(&key_owned) {
                return Err(StoreWriteError::DuplicateKey(key_owned).into());
            }
            data.insert(key_owned, doc_owned);
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key_owned = key.to_string();
        self.operate(key, move |data| {
            if data.remove(&key_owned).is_none() {
                return Err(StoreWriteError::MissingKey(key_owned).into());
            }
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key_owned = key.to_string();
        self.operate(key, move |data| {
            data.remove(&key_owned);
            Ok(())
        })
        .await
    }
}
