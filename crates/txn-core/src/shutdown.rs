//! Shutdown signaling for the committer and deadline timer loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared shutdown flag plus the `Notify` used to wake anything blocked on
/// the hold, drained, or sync waitqueues so it can observe the flag.
#[derive(Debug)]
pub(crate) struct ShutdownState {
    initiated: AtomicBool,
    wake: Notify,
}

impl ShutdownState {
    pub(crate) fn new() -> Self {
        Self {
            initiated: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    #[inline]
    pub(crate) fn is_initiated(&self) -> bool {
        self.initiated.load(Ordering::Acquire)
    }

    pub(crate) fn initiate(&self) {
        self.initiated.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    pub(crate) fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.wake.notified()
    }
}

/// A cloneable handle for triggering core shutdown from outside.
///
/// Idempotent: only the first call has any effect, mirroring
/// `ShutdownSignal` elsewhere in this workspace.
#[derive(Clone)]
pub struct ShutdownSignal {
    state: Arc<ShutdownState>,
}

impl ShutdownSignal {
    pub(crate) fn new(state: Arc<ShutdownState>) -> Self {
        Self { state }
    }

    /// Requests shutdown: wakes every task blocked on a waitqueue so it can
    /// observe the shutdown flag and return `TxnError::Interrupted`.
    pub fn shutdown(&self) {
        if !self.state.is_initiated() {
            self.state.initiate();
        }
    }

    /// `true` if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.state.is_initiated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_idempotent() {
        let state = Arc::new(ShutdownState::new());
        let signal = ShutdownSignal::new(state.clone());
        assert!(!signal.is_shutdown());
        signal.shutdown();
        signal.shutdown();
        assert!(signal.is_shutdown());
        assert!(state.is_initiated());
    }
}
