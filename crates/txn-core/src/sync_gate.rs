//! The wait/notify surface for forcing and waiting on commits
//! (spec.md §4.3): `sync` and `fsync`.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::TxnError;
use crate::manager::Shared;
use crate::metrics::TxnMetrics;

pub(crate) struct Inner {
    /// Incremented once per completed commit attempt.
    write_count: u64,
    last_result: Result<(), TxnError>,
}

/// Commit-result state shared between the `Committer` (which publishes
/// results) and every `SyncGate` handle (which reads them). Corresponds to
/// spec.md §5's "commit-result lock".
pub(crate) struct CommitResultState {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl CommitResultState {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                write_count: 0,
                last_result: Ok(()),
            }),
            notify: Notify::new(),
        }
    }

    pub(crate) fn record(&self, result: Result<(), TxnError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.write_count += 1;
        inner.last_result = result;
        drop(inner);
        self.notify.notify_waiters();
    }

    fn snapshot(&self) -> (u64, Result<(), TxnError>) {
        let inner = self.inner.lock().unwrap();
        (inner.write_count, inner.last_result.clone())
    }

    pub(crate) fn wake_all(&self) {
        self.notify.notify_waiters();
    }
}

/// Handle for forcing a commit and, optionally, waiting for it to finish.
#[derive(Clone)]
pub struct SyncGate {
    shared: Arc<Shared>,
    results: Arc<CommitResultState>,
    metrics: Arc<TxnMetrics>,
}

impl SyncGate {
    pub(crate) fn new(
        shared: Arc<Shared>,
        results: Arc<CommitResultState>,
        metrics: Arc<TxnMetrics>,
    ) -> Self {
        Self {
            shared,
            results,
            metrics,
        }
    }

    /// Requests a commit. If `wait` is `true`, blocks until a commit that
    /// started at or after this call completes, then returns its result.
    /// If `false`, kicks the committer and returns immediately.
    pub async fn sync(&self, wait: bool) -> Result<(), TxnError> {
        let (baseline, _) = self.results.snapshot();
        self.shared.commit_kick.notify_one();

        if !wait {
            return Ok(());
        }

        loop {
            if self.shared.shutdown.is_initiated() {
                return Err(TxnError::Interrupted);
            }

            let notified = self.results.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (count, result) = self.results.snapshot();
            if count > baseline {
                return result;
            }

            notified.await;
        }
    }

    /// Forces a commit and waits for it, as a named alias for
    /// `sync(true)` matching the original `fsync` entry point.
    pub async fn fsync(&self) -> Result<(), TxnError> {
        self.metrics.inc_commit_fsync();
        self.sync(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_has_zero_writes_and_ok_result() {
        let state = CommitResultState::new();
        let (count, result) = state.snapshot();
        assert_eq!(count, 0);
        assert!(result.is_ok());
    }

    #[test]
    fn record_advances_count_and_stores_result() {
        let state = CommitResultState::new();
        state.record(Ok(()));
        state.record(Err(TxnError::OutOfMemory));
        let (count, result) = state.snapshot();
        assert_eq!(count, 2);
        assert!(result.is_err());
    }
}
