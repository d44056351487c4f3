//! Per-actor reservation bookkeeping, stored in actor-local (task-local)
//! storage rather than behind the manager's mutex so that
//! [`crate::TransactionManager::currently_held`] is a lock-free query.
//!
//! This stands in for the original kernel source's `current->journal_info`
//! pointer: instead of stashing a pointer on the current thread, each
//! writer task scopes a `tokio::task_local!` slot around its work with
//! [`writer_scope`].

use std::cell::RefCell;
use std::fmt;

use crate::config::RESERVATION_MAGIC;
use crate::error::TxnError;
use crate::invariants::debug_assert_reservation_magic;
use crate::item_count::ItemCount;

tokio::task_local! {
    static RESERVATION: RefCell<Option<ReservationState>>;
}

/// Identifies the task holding a reservation. Actors are tokio tasks, not
/// OS threads, so this wraps the runtime's own task id rather than minting
/// a separate counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorId(tokio::task::Id);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Returns the identity of the currently running task.
///
/// Panics if called outside of a tokio task, matching the original's
/// assumption that `current` is always valid inside kernel context.
pub fn current_actor() -> ActorId {
    ActorId(tokio::task::id())
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ReservationState {
    magic: u32,
    /// Sum of every nested `hold` this actor currently has outstanding.
    pub(crate) reserved: ItemCount,
    /// Sum of every `track` delta recorded against those holds.
    pub(crate) actual: ItemCount,
    /// Nesting depth, for reentrant `hold` calls by the same actor.
    pub(crate) depth: u32,
}

impl ReservationState {
    fn new() -> Self {
        Self {
            magic: RESERVATION_MAGIC,
            reserved: ItemCount::ZERO,
            actual: ItemCount::ZERO,
            depth: 0,
        }
    }
}

/// Wraps `fut` so that actor-local reservation bookkeeping is available to
/// [`crate::TransactionManager::hold`]/`track`/`release`/`currently_held`
/// for the duration of the future. Writer tasks must call this once, at
/// the top of their task body.
pub async fn writer_scope<F>(fut: F) -> F::Output
where
    F: std::future::Future,
{
    RESERVATION.scope(RefCell::new(None), fut).await
}

/// A capacity grant returned by `hold`, consumed by `release`.
///
/// Dropping a `Reservation` without passing it to
/// [`crate::TransactionManager::release`] is a programmer error: in debug
/// builds it trips a `debug_assert!`, mirroring the original's `BUG_ON` on
/// an un-released transaction handle.
#[derive(Debug)]
pub struct Reservation {
    pub(crate) actor: ActorId,
    pub(crate) amount: ItemCount,
    released: bool,
}

impl Reservation {
    pub(crate) fn new(actor: ActorId, amount: ItemCount) -> Self {
        Self {
            actor,
            amount,
            released: false,
        }
    }

    pub(crate) fn mark_released(&mut self) {
        self.released = true;
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn amount(&self) -> ItemCount {
        self.amount
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        debug_assert!(
            self.released,
            "Reservation for {} dropped without TransactionManager::release",
            self.actor
        );
    }
}

/// Runs `f` against this task's reservation slot, initializing it on first
/// use. Returns `Err` if called outside of [`writer_scope`].
pub(crate) fn with_state<R>(
    f: impl FnOnce(&mut ReservationState) -> R,
) -> Result<R, TxnError> {
    RESERVATION
        .try_with(|cell| {
            let mut slot = cell.borrow_mut();
            let state = slot.get_or_insert_with(ReservationState::new);
            debug_assert_reservation_magic!(state.magic);
            f(state)
        })
        .map_err(|_| {
            TxnError::InvalidArgument(
                "called outside of an actor's writer_scope".to_string(),
            )
        })
}

/// Lock-free read of this actor's currently reserved capacity. Returns
/// zero both when no reservation is outstanding and when called outside
/// of `writer_scope`, matching `currently_held`'s "no hold" case.
pub(crate) fn current_reserved() -> ItemCount {
    RESERVATION
        .try_with(|cell| {
            cell.borrow()
                .as_ref()
                .map_or(ItemCount::ZERO, |s| s.reserved)
        })
        .unwrap_or(ItemCount::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_reserved_is_zero_outside_any_hold() {
        writer_scope(async {
            assert_eq!(current_reserved(), ItemCount::ZERO);
        })
        .await;
    }

    #[tokio::test]
    async fn with_state_fails_outside_writer_scope() {
        let result = with_state(|_| ());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn with_state_tracks_reservation_within_scope() {
        writer_scope(async {
            with_state(|s| s.reserved = ItemCount::new(4, 16)).unwrap();
            assert_eq!(current_reserved(), ItemCount::new(4, 16));
        })
        .await;
    }
}
