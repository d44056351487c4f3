//! Global holder/capacity bookkeeping shared between writer tasks and the
//! committer.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::collab::ItemStore;
use crate::error::TxnError;
use crate::invariants::{
    debug_assert_capacity_nonneg, debug_assert_holders_nonneg, debug_assert_single_committer,
};
use crate::item_count::ItemCount;
use crate::metrics::TxnMetrics;
use crate::reservation::{self, current_actor, ActorId, Reservation};
use crate::shutdown::ShutdownState;

/// Aggregate state guarded by a single mutex, as spec.md §5 requires: only
/// the sums and flags live here, never a per-actor reservation, so that
/// [`TransactionManager::currently_held`] can stay lock-free.
pub(crate) struct ManagerState {
    pub(crate) reserved: ItemCount,
    pub(crate) holders: i64,
    pub(crate) committing: bool,
    pub(crate) committer_actor: Option<ActorId>,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            reserved: ItemCount::ZERO,
            holders: 0,
            committing: false,
            committer_actor: None,
        }
    }
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<ManagerState>,
    /// Wakes holders waiting for capacity to free up, or for a commit in
    /// progress to finish.
    pub(crate) hold_notify: Notify,
    /// Wakes the committer once the last holder has released.
    pub(crate) drained_notify: Notify,
    /// Wakes the committer loop to attempt a commit (capacity exhaustion,
    /// an explicit sync request, or the deadline timer).
    pub(crate) commit_kick: Notify,
    pub(crate) item_store: Arc<dyn ItemStore>,
    pub(crate) shutdown: Arc<ShutdownState>,
    pub(crate) metrics: Arc<TxnMetrics>,
}

/// The transaction lifecycle and capacity reservation surface (spec.md
/// §4.1). Cheap to clone: every clone shares the same underlying state.
#[derive(Clone)]
pub struct TransactionManager {
    pub(crate) shared: Arc<Shared>,
}

impl TransactionManager {
    pub(crate) fn new(
        item_store: Arc<dyn ItemStore>,
        shutdown: Arc<ShutdownState>,
        metrics: Arc<TxnMetrics>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ManagerState::new()),
                hold_notify: Notify::new(),
                drained_notify: Notify::new(),
                commit_kick: Notify::new(),
                item_store,
                shutdown,
                metrics,
            }),
        }
    }

    /// Reserves `count` against the current transaction, blocking until
    /// either capacity is available or a commit in progress completes.
    ///
    /// Reentrant: if the calling actor already holds a reservation, this
    /// nests rather than blocking, mirroring the original's tolerance of
    /// recursive `hold_trans` calls from the same kernel thread.
    pub async fn hold(&self, count: ItemCount) -> Result<Reservation, TxnError> {
        if count.items <= 0 || count.vals < 0 {
            return Err(TxnError::InvalidArgument(format!(
                "non-positive item count: {count:?}"
            )));
        }
        if !self.shared.item_store.fits_single(count.items, count.vals) {
            return Err(TxnError::InvalidArgument(format!(
                "{count:?} could never fit in a single segment"
            )));
        }

        let actor = current_actor();
        loop {
            if self.shared.shutdown.is_initiated() {
                return Err(TxnError::Interrupted);
            }

            let notified = self.shared.hold_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let already_holding = reservation::current_reserved() != ItemCount::ZERO;
            let acquired = {
                let mut state = self.shared.state.lock().unwrap();
                self.try_acquire_hold(&mut state, already_holding, count)
            };

            if acquired {
                reservation::with_state(|s| {
                    s.reserved += count;
                    s.depth += 1;
                })?;
                tracing::trace!(?actor, ?count, "hold acquired");
                return Ok(Reservation::new(actor, count));
            }

            tracing::debug!(?actor, ?count, "hold blocked, waiting for commit to drain");
            self.shared.commit_kick.notify_one();
            notified.await;
        }
    }

    /// spec.md §4.1 steps 2-3: admission requires both that no other
    /// transaction is committing (unless this actor is already inside one)
    /// and that the *summed* reservation, including this request, could
    /// still fit a single segment. The precondition checked in `hold`
    /// before this is called only asks whether `count` alone could ever
    /// fit; this asks whether it fits on top of everything already held.
    fn try_acquire_hold(
        &self,
        state: &mut ManagerState,
        already_holding: bool,
        count: ItemCount,
    ) -> bool {
        if state.committing && !already_holding {
            return false;
        }

        let new_reserved = state.reserved + count;
        if !self
            .shared
            .item_store
            .fits_single(new_reserved.items, new_reserved.vals)
        {
            self.shared.metrics.inc_commit_full();
            return false;
        }

        state.reserved = new_reserved;
        state.holders += 1;
        debug_assert_capacity_nonneg!(state.reserved.items, state.reserved.vals);
        debug_assert_holders_nonneg!(state.holders);
        true
    }

    /// Records `delta` dirty-item/value usage against the calling actor's
    /// outstanding reservation. Programmer error (not a `Result` case) to
    /// call without an outstanding `hold`; checked by `debug_assert!` in
    /// debug builds only, matching spec.md §7.
    pub fn track(&self, delta: ItemCount) -> Result<(), TxnError> {
        reservation::with_state(|s| {
            s.actual += delta;
            crate::invariants::debug_assert_within_reservation!(s.actual, s.reserved);
        })
    }

    /// Releases a previously acquired reservation, waking any writers
    /// blocked on capacity and the committer if this was the last holder.
    pub fn release(&self, mut reservation: Reservation) {
        let amount = reservation.amount();
        reservation.mark_released();

        let holders_after = {
            let mut state = self.shared.state.lock().unwrap();
            state.reserved -= amount;
            state.holders -= 1;
            debug_assert_holders_nonneg!(state.holders);
            state.holders
        };

        let _ = reservation::with_state(|s| {
            s.reserved -= amount;
            s.depth = s.depth.saturating_sub(1);
        });

        self.shared.hold_notify.notify_waiters();
        if holders_after == 0 {
            self.shared.drained_notify.notify_waiters();
        }
    }

    /// Lock-free read of the calling actor's currently reserved capacity.
    pub fn currently_held(&self) -> ItemCount {
        reservation::current_reserved()
    }

    pub(crate) fn try_enter_commit(&self, actor: ActorId) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        debug_assert_single_committer!(state.committer_actor, actor);
        if state.committing {
            return false;
        }
        state.committing = true;
        state.committer_actor = Some(actor);
        true
    }

    pub(crate) fn leave_commit(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.committing = false;
        state.committer_actor = None;
        drop(state);
        self.shared.hold_notify.notify_waiters();
    }

    pub(crate) fn holders(&self) -> i64 {
        self.shared.state.lock().unwrap().holders
    }
}
