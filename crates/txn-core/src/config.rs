use std::time::Duration;

/// Tunables for the transaction commit core.
#[derive(Debug, Clone)]
pub struct TxnConfig {
    /// How long the deadline timer waits after the last commit before
    /// forcing an empty commit to advance the sequence number.
    ///
    /// Default: 10 seconds, matching the original `TRANS_SYNC_DELAY`.
    pub sync_delay: Duration,
}

impl Default for TxnConfig {
    fn default() -> Self {
        Self {
            sync_delay: Duration::from_secs(10),
        }
    }
}

impl TxnConfig {
    pub fn with_sync_delay(mut self, sync_delay: Duration) -> Self {
        self.sync_delay = sync_delay;
        self
    }
}

/// Debug-build poisoning sentinel for reservation scratch storage, mirroring
/// `SCOUTFS_RESERVATION_MAGIC` in the original source. Only referenced by
/// `debug_assert!`s; it has no effect in release builds.
pub(crate) const RESERVATION_MAGIC: u32 = 0xd57c_d13b;
