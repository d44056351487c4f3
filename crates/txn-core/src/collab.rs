//! Capability contracts for the collaborators the commit core drives but
//! does not implement: the dirty item store, segment I/O, inode writeback,
//! and the control plane that hands out segment numbers and sequence
//! numbers. `txn-store` provides in-memory implementations of these traits
//! for tests; a real mount would back them with on-disk structures.

use async_trait::async_trait;

use crate::error::StoreError;

/// An in-flight segment being built by the commit pipeline.
///
/// Opaque to `txn-core`: collaborators fill it in (`drain_into`,
/// `new_segment`) and read it back (`total_bytes`, `submit`, `record_segment`)
/// but the commit pipeline itself never inspects its contents.
#[derive(Debug, Default)]
pub struct Segment {
    pub segno: u64,
    pub payload: Vec<u8>,
}

/// A handle the commit pipeline submits I/O against and later waits on.
///
/// Left as a unit-like marker here; a real `SegmentWriter` would stash
/// whatever it needs (a channel, a future, a raw completion token) behind
/// its own implementation rather than inside this type.
#[derive(Debug, Default, Clone, Copy)]
pub struct Completion {
    pub token: u64,
}

/// The in-memory dirty-item tracker: everything written since the last
/// commit, plus the capacity questions `hold` needs answered.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// `true` if any item is dirty, i.e. there is something to commit.
    fn has_dirty(&self) -> bool;

    /// `true` if a transaction reserving `(items, vals)` could ever commit
    /// on its own, regardless of what else is currently dirty. Used by
    /// `hold` to reject reservations no segment could ever satisfy.
    fn fits_single(&self, items: i64, vals: i64) -> bool;

    /// Move every dirty item into `segment`, clearing the dirty set.
    async fn drain_into(&self, segment: &mut Segment) -> Result<(), StoreError>;
}

/// Starts and waits for inode metadata writeback ahead of a commit.
#[async_trait]
pub trait InodeWriteback: Send + Sync {
    /// Begin writeback. `sync` requests waiting for completion before
    /// returning; otherwise this only submits the I/O.
    async fn start(&self, sync: bool) -> Result<(), StoreError>;
}

/// Allocates, submits, and waits on the on-disk segment backing a commit.
#[async_trait]
pub trait SegmentWriter: Send + Sync {
    /// Instantiate a fresh segment for the given segment number.
    async fn new_segment(&self, segno: u64) -> Segment;

    /// Submit `segment`'s I/O, recording progress against `completion`.
    async fn submit(&self, segment: &Segment, completion: &Completion) -> Result<(), StoreError>;

    /// Block until the I/O registered under `completion` finishes.
    async fn wait(&self, completion: &Completion) -> Result<(), StoreError>;

    /// Total bytes occupied by `segment`, for metrics.
    fn total_bytes(&self, segment: &Segment) -> u64;
}

/// The filesystem's control plane: segment number allocation, manifest
/// updates, and the global sequence counter.
#[async_trait]
pub trait ControlClient: Send + Sync {
    /// Allocate the next segment number for a level-0 segment.
    async fn alloc_segno(&self) -> Result<u64, StoreError>;

    /// Record `segment` as committed at the given manifest level.
    async fn record_segment(&self, segment: &Segment, level: u8) -> Result<(), StoreError>;

    /// Advance the global sequence number, writing the new value back
    /// through `current_seq`.
    async fn advance_seq(&self, current_seq: &mut u64) -> Result<(), StoreError>;
}
