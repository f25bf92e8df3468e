//! Bounded-concurrency asynchronous bulk-write dispatch.
//!
//! The scheduler admits at most `concurrency` operations in flight at once
//! as a sliding window: as each operation completes, the next queued record
//! is admitted, keeping store utilization high without unbounded queuing. A
//! single slow or hung operation never blocks submission of independent
//! keys. Each completion is folded into a [`FailureTally`] immediately;
//! outcomes arrive in completion order, which is fine because the tally is
//! commutative.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{DocferryError, Result, StoreWriteError};
use crate::store::DocumentStore;

use super::action::{ActionKind, BulkActionRecord};
use super::gate::FailureTally;

/// Why an operation counted as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// The operation did not complete within the per-operation timeout.
    /// Its eventual late completion, if any, is ignored.
    Timeout,

    /// The task attempt was cancelled before or during the operation.
    Cancelled,

    /// The store reported a failure.
    Store(String),
}

/// Outcome of one submitted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub key: String,
    pub success: bool,
    pub failure: Option<FailureClass>,
}

/// Dispatches bulk actions against a borrowed store connection.
pub struct BulkWriteScheduler<'a> {
    store: &'a dyn DocumentStore,
    concurrency: usize,
    op_timeout: Duration,
    cancel: CancellationToken,
}

impl<'a> BulkWriteScheduler<'a> {
    pub fn new(store: &'a dyn DocumentStore, concurrency: usize, op_timeout: Duration) -> Self {
        Self {
            store,
            concurrency,
            op_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Use the given token for cancellation. When it fires, no new
    /// operations are admitted and in-flight ones are abandoned; store-side
    /// effects of already-dispatched operations are not rolled back.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Submit a batch and wait for every record to produce an outcome or be
    /// abandoned by timeout.
    pub async fn submit(&self, batch: Vec<BulkActionRecord>) -> FailureTally {
        let limit = self.concurrency.max(1);
        debug!(
            "Submitting {} actions with concurrency limit {limit}",
            batch.len()
        );

        let mut outcomes = stream::iter(batch.into_iter().map(|record| self.dispatch(record)))
            .buffer_unordered(limit);

        let mut tally = FailureTally::new();
        while let Some(outcome) = outcomes.next().await {
            if outcome.success {
                tally.record_success();
            } else {
                warn!(
                    "Operation failed for key '{}': {:?}",
                    outcome.key, outcome.failure
                );
                tally.record_failure();
            }
        }
        tally
    }

    /// Run one action to an outcome. Never returns an error: per-operation
    /// failures are classified, not propagated.
    async fn dispatch(&self, record: BulkActionRecord) -> OperationOutcome {
        let key = record.key.clone();

        if self.cancel.is_cancelled() {
            return OperationOutcome {
                key,
                success: false,
                failure: Some(FailureClass::Cancelled),
            };
        }

        let attempt = tokio::time::timeout(self.op_timeout, self.apply(&record));
        let result = tokio::select! {
            _ = self.cancel.cancelled() => {
                return OperationOutcome {
                    key,
                    success: false,
                    failure: Some(FailureClass::Cancelled),
                };
            }
            result = attempt => result,
        };

        match result {
            Ok(Ok(())) => OperationOutcome {
                key,
                success: true,
                failure: None,
            },
            Ok(Err(e)) => OperationOutcome {
                key,
                success: false,
                failure: Some(FailureClass::Store(e.to_string())),
            },
            // Dropping the timed-out future abandons it; a late completion
            // cannot be folded in.
            Err(_) => OperationOutcome {
                key,
                success: false,
                failure: Some(FailureClass::Timeout),
            },
        }
    }

    async fn apply(&self, record: &BulkActionRecord) -> Result<()> {
        let document = record.document.as_deref().unwrap_or("");
        match record.kind {
            ActionKind::Set => self.store.set(&record.key, document, record.expiry).await,
            ActionKind::Add => {
                match self.store.add(&record.key, document, record.expiry).await {
                    // A replayed split hits duplicates on Add; the record is
                    // already in the store, so this is a success.
                    Err(DocferryError::StoreWrite(StoreWriteError::DuplicateKey(_))) => Ok(()),
                    other => other,
                }
            }
            ActionKind::Delete => self.store.delete(&record.key).await,
            ActionKind::Remove => self.store.remove(&record.key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryStore;

    fn set_action(key: &str, document: &str) -> BulkActionRecord {
        BulkActionRecord {
            key: key.to_string(),
            kind: ActionKind::Set,
            document: Some(document.to_string()),
            expiry: None,
        }
    }

    fn action(key: &str, kind: ActionKind) -> BulkActionRecord {
        BulkActionRecord {
            key: key.to_string(),
            kind,
            document: Some("doc".to_string()),
            expiry: None,
        }
    }

    #[tokio::test]
    async fn test_all_operations_succeed() {
        let store = MemoryStore::new();
        let scheduler = BulkWriteScheduler::new(&store, 4, Duration::from_secs(5));

        let batch: Vec<_> = (0..20).map(|i| set_action(&format!("k{i}"), "d")).collect();
        let tally = scheduler.submit(batch).await;

        assert_eq!(tally.attempted(), 20);
        assert_eq!(tally.failed(), 0);
        assert_eq!(store.len(), 20);
    }

    #[tokio::test]
    async fn test_hundred_actions_seven_failures() {
        let mut store = MemoryStore::new();
        for i in 0..7 {
            store = store.with_fail_key(&format!("k{i}"));
        }
        let scheduler = BulkWriteScheduler::new(&store, 10, Duration::from_secs(5));

        let batch: Vec<_> = (0..100).map(|i| set_action(&format!("k{i}"), "d")).collect();
        let tally = scheduler.submit(batch).await;

        assert_eq!(tally.attempted(), 100);
        assert_eq!(tally.failed(), 7);
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let store = MemoryStore::new().with_op_delay(Duration::from_millis(10));
        let scheduler = BulkWriteScheduler::new(&store, 10, Duration::from_secs(5));

        let batch: Vec<_> = (0..100).map(|i| set_action(&format!("k{i}"), "d")).collect();
        scheduler.submit(batch).await;

        assert!(store.max_in_flight() <= 10);
        // With a uniform delay the window should actually fill up.
        assert!(store.max_in_flight() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_does_not_block_others() {
        let store = MemoryStore::new().with_slow_key("hung", Duration::from_secs(3600));
        let scheduler = BulkWriteScheduler::new(&store, 2, Duration::from_secs(1));

        let batch = vec![
            action("hung", ActionKind::Set),
            set_action("fast1", "d"),
            set_action("fast2", "d"),
        ];
        let tally = scheduler.submit(batch).await;

        assert_eq!(tally.attempted(), 3);
        assert_eq!(tally.failed(), 1);
        assert_eq!(store.document("fast1").as_deref(), Some("d"));
        assert_eq!(store.document("fast2").as_deref(), Some("d"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let store = MemoryStore::new().with_slow_key("slow", Duration::from_secs(10));
        let scheduler = BulkWriteScheduler::new(&store, 1, Duration::from_secs(1));

        let tally = scheduler.submit(vec![action("slow", ActionKind::Set)]).await;

        assert_eq!(tally.attempted(), 1);
        assert_eq!(tally.failed(), 1);
    }

    #[tokio::test]
    async fn test_add_duplicate_treated_as_success() {
        let store = MemoryStore::new().with_data(vec![("existing", "old")]);
        let scheduler = BulkWriteScheduler::new(&store, 2, Duration::from_secs(5));

        let tally = scheduler
            .submit(vec![action("existing", ActionKind::Add)])
            .await;

        assert_eq!(tally.failed(), 0);
        // The original document stays; Add does not replace.
        assert_eq!(store.document("existing").as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_strict_delete_of_missing_key_fails() {
        let store = MemoryStore::new();
        let scheduler = BulkWriteScheduler::new(&store, 2, Duration::from_secs(5));

        let tally = scheduler
            .submit(vec![action("ghost", ActionKind::Delete)])
            .await;
        assert_eq!(tally.failed(), 1);
    }

    #[tokio::test]
    async fn test_tolerant_remove_of_missing_key_succeeds() {
        let store = MemoryStore::new();
        let scheduler = BulkWriteScheduler::new(&store, 2, Duration::from_secs(5));

        let tally = scheduler
            .submit(vec![action("ghost", ActionKind::Remove)])
            .await;
        assert_eq!(tally.failed(), 0);
    }

    #[tokio::test]
    async fn test_resubmitting_idempotent_batch_is_stable() {
        let store = MemoryStore::new();
        let scheduler = BulkWriteScheduler::new(&store, 4, Duration::from_secs(5));

        let batch = vec![
            set_action("a", "1"),
            set_action("b", "2"),
            action("c", ActionKind::Remove),
        ];
        scheduler.submit(batch.clone()).await;
        let first: Vec<_> = ["a", "b"].iter().map(|k| store.document(k)).collect();

        scheduler.submit(batch).await;
        let second: Vec<_> = ["a", "b"].iter().map(|k| store.document(k)).collect();

        assert_eq!(first, second);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_admission() {
        let store = MemoryStore::new();
        let token = CancellationToken::new();
        token.cancel();
        let scheduler = BulkWriteScheduler::new(&store, 2, Duration::from_secs(5))
            .with_cancellation(token);

        let batch: Vec<_> = (0..10).map(|i| set_action(&format!("k{i}"), "d")).collect();
        let tally = scheduler.submit(batch).await;

        assert_eq!(tally.attempted(), 10);
        assert_eq!(tally.failed(), 10);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped_to_one() {
        let store = MemoryStore::new();
        let scheduler = BulkWriteScheduler::new(&store, 0, Duration::from_secs(5));

        let tally = scheduler.submit(vec![set_action("k", "d")]).await;
        assert_eq!(tally.attempted(), 1);
        assert_eq!(tally.failed(), 0);
    }
}
