//! The single-writer commit pipeline: drains holders, runs the ordered
//! on-disk commit sequence, and publishes the result to `SyncGate` waiters.

use std::sync::Arc;

use tokio::sync::Mutex as AsyncMutex;

use crate::collab::{Completion, ControlClient, InodeWriteback, SegmentWriter};
use crate::config::TxnConfig;
use crate::error::{CommitStep, TxnError};
use crate::manager::TransactionManager;
use crate::metrics::TxnMetrics;
use crate::reservation::current_actor;
use crate::sync_gate::CommitResultState;

/// Drives commits for one `TransactionManager`. There is exactly one
/// `Committer` task per core instance; it is not meant to be spawned more
/// than once (`TransactionManager` itself enforces single-writer commit
/// via `try_enter_commit`, but only one task should ever be racing to
/// enter it).
pub struct Committer {
    manager: TransactionManager,
    writeback: Arc<dyn InodeWriteback>,
    segment_writer: Arc<dyn SegmentWriter>,
    control: Arc<dyn ControlClient>,
    metrics: Arc<TxnMetrics>,
    config: TxnConfig,
    seq: AsyncMutex<u64>,
    results: Arc<CommitResultState>,
}

impl Committer {
    pub(crate) fn new(
        manager: TransactionManager,
        writeback: Arc<dyn InodeWriteback>,
        segment_writer: Arc<dyn SegmentWriter>,
        control: Arc<dyn ControlClient>,
        metrics: Arc<TxnMetrics>,
        config: TxnConfig,
        results: Arc<CommitResultState>,
    ) -> Self {
        Self {
            manager,
            writeback,
            segment_writer,
            control,
            metrics,
            config,
            seq: AsyncMutex::new(0),
            results,
        }
    }

    /// Runs the commit loop until shutdown is requested. Intended to be
    /// spawned as its own `tokio::task`.
    pub async fn run(self: Arc<Self>) {
        let mut deadline = tokio::time::Instant::now() + self.config.sync_delay;
        loop {
            if self.manager.shared.shutdown.is_initiated() {
                tracing::info!("committer observed shutdown, exiting");
                return;
            }

            let kicked = self.manager.shared.commit_kick.notified();
            tokio::pin!(kicked);
            kicked.as_mut().enable();

            let deadline_expired = tokio::select! {
                () = kicked => false,
                () = tokio::time::sleep_until(deadline) => {
                    tracing::debug!("deadline timer fired");
                    true
                }
            };

            if self.manager.shared.shutdown.is_initiated() {
                tracing::info!("committer observed shutdown, exiting");
                return;
            }

            self.run_commit_once(deadline_expired).await;
            deadline = tokio::time::Instant::now() + self.config.sync_delay;
        }
    }

    async fn run_commit_once(&self, deadline_expired: bool) {
        let actor = current_actor();
        if !self.manager.try_enter_commit(actor) {
            return;
        }

        self.wait_drained().await;
        let result = self.run_pipeline(deadline_expired).await;

        if let Err(err) = &result {
            tracing::warn!(error = %err, "commit pipeline failed");
        } else {
            tracing::info!("commit completed");
        }

        self.manager.leave_commit();
        self.results.record(result);
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.manager.shared.drained_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.manager.holders() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// spec.md §4.2 step 3: a commit attempt does real work only if there is
    /// something dirty to write out; an attempt woken by the deadline timer
    /// with nothing dirty still advances the sequence number so waiters see
    /// progress, but allocates no segment. An attempt that is neither dirty
    /// nor deadline-driven (e.g. a `sync` kicked while idle) does nothing at
    /// all beyond publishing a trivial result.
    async fn run_pipeline(&self, deadline_expired: bool) -> Result<(), TxnError> {
        let item_store = self.manager.shared.item_store.clone();

        if !item_store.has_dirty() {
            if deadline_expired {
                self.advance_seq().await?;
                self.metrics.inc_commit_timer();
            }
            return Ok(());
        }

        self.writeback
            .start(true)
            .await
            .map_err(|e| TxnError::io(CommitStep::Writeback, e))?;

        let segno = self.alloc_segno().await?;

        let mut segment = self.segment_writer.new_segment(segno).await;
        tracing::trace!(segno, "new segment instantiated");

        item_store
            .drain_into(&mut segment)
            .await
            .map_err(|e| TxnError::io(CommitStep::DrainItems, e))?;
        self.metrics.inc_level0_seg_writes();
        self.metrics
            .add_level0_seg_write_bytes(self.segment_writer.total_bytes(&segment));

        let completion = Completion::default();
        self.segment_writer
            .submit(&segment, &completion)
            .await
            .map_err(|e| TxnError::io(CommitStep::SubmitSegment, e))?;

        self.writeback
            .start(false)
            .await
            .map_err(|e| TxnError::io(CommitStep::WritebackSubmit, e))?;

        self.segment_writer
            .wait(&completion)
            .await
            .map_err(|e| TxnError::io(CommitStep::WaitCompletion, e))?;

        self.record_segment(&segment).await?;
        self.advance_seq().await?;

        if deadline_expired {
            self.metrics.inc_commit_timer();
        }
        Ok(())
    }

    async fn alloc_segno(&self) -> Result<u64, TxnError> {
        self.control.alloc_segno().await.map_err(|e| {
            tracing::warn!(step = %CommitStep::AllocSegno, error = %e, "control plane call failed");
            TxnError::control(e)
        })
    }

    async fn record_segment(&self, segment: &crate::collab::Segment) -> Result<(), TxnError> {
        self.control.record_segment(segment, 0).await.map_err(|e| {
            tracing::warn!(step = %CommitStep::RecordSegment, error = %e, "control plane call failed");
            TxnError::control(e)
        })
    }

    async fn advance_seq(&self) -> Result<(), TxnError> {
        let mut seq = self.seq.lock().await;
        self.control.advance_seq(&mut seq).await.map_err(|e| {
            tracing::warn!(step = %CommitStep::AdvanceSeq, error = %e, "control plane call failed");
            TxnError::control(e)
        })
    }
}
