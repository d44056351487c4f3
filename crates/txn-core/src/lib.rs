//! Transaction commit core for a copy-on-write filesystem.
//!
//! This crate implements the commit-side state machine that every writer
//! in the filesystem reserves capacity from and every syncer forces a
//! commit through: capacity reservation (`hold`/`release`/`track`), the
//! single-writer commit pipeline (`Committer`), and the sync/fsync wait
//! protocol (`SyncGate`). It does not implement on-disk formats, block
//! I/O, or the control plane itself — those are named as collaborator
//! traits in [`collab`] and implemented elsewhere (see `txn-store`).

mod collab;
mod committer;
mod config;
mod error;
mod invariants;
mod item_count;
mod manager;
mod metrics;
mod reservation;
mod shutdown;
mod sync_gate;

use std::sync::Arc;

pub use collab::{Completion, ControlClient, InodeWriteback, ItemStore, Segment, SegmentWriter};
pub use committer::Committer;
pub use config::TxnConfig;
pub use error::{CommitStep, StoreError, TxnError};
pub use item_count::ItemCount;
pub use manager::TransactionManager;
pub use metrics::{MetricsSnapshot, TxnMetrics};
pub use reservation::{current_actor, writer_scope, ActorId, Reservation};
pub use shutdown::ShutdownSignal;
pub use sync_gate::SyncGate;

use shutdown::ShutdownState;
use sync_gate::CommitResultState;

/// Everything `setup` hands back: the handles the rest of the filesystem
/// calls into, plus the background committer task.
pub struct TxnCore {
    pub manager: TransactionManager,
    pub sync_gate: SyncGate,
    pub metrics: Arc<TxnMetrics>,
    pub shutdown: ShutdownSignal,
    committer_task: tokio::task::JoinHandle<()>,
}

impl TxnCore {
    /// Requests shutdown and wakes every task blocked on a waitqueue so it
    /// can observe the shutdown flag and unwind with `TxnError::Interrupted`.
    pub fn request_shutdown(&self) {
        self.shutdown.shutdown();
        self.manager.shared.hold_notify.notify_waiters();
        self.manager.shared.drained_notify.notify_waiters();
        self.manager.shared.commit_kick.notify_waiters();
    }

    /// Waits for the committer task to observe shutdown and exit. Callers
    /// should call [`request_shutdown`](Self::request_shutdown) first.
    pub async fn join(self) {
        let _ = self.committer_task.await;
    }
}

/// Wires up a `TransactionManager`, `SyncGate`, and a spawned `Committer`
/// task against the given collaborators, corresponding to spec.md's
/// `setup` entry point.
pub fn setup(
    item_store: Arc<dyn ItemStore>,
    writeback: Arc<dyn InodeWriteback>,
    segment_writer: Arc<dyn SegmentWriter>,
    control: Arc<dyn ControlClient>,
    config: TxnConfig,
) -> TxnCore {
    let shutdown_state = Arc::new(ShutdownState::new());
    let metrics = Arc::new(TxnMetrics::new());
    let manager = TransactionManager::new(item_store, shutdown_state.clone(), metrics.clone());
    let results = Arc::new(CommitResultState::new());
    let sync_gate = SyncGate::new(manager.shared.clone(), results.clone(), metrics.clone());

    let committer = Arc::new(Committer::new(
        manager.clone(),
        writeback,
        segment_writer,
        control,
        metrics.clone(),
        config,
        results,
    ));
    let committer_task = tokio::spawn(Committer::run(committer));

    TxnCore {
        manager,
        sync_gate,
        metrics,
        shutdown: ShutdownSignal::new(shutdown_state),
        committer_task,
    }
}
