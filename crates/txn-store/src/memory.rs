//! Minimal in-memory reference implementations of the `txn-core`
//! collaborator traits, sufficient to drive `txn-core`'s own tests and
//! `txn-sim`'s simulation without real block I/O or a real control-plane
//! RPC client.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use txn_core::{Completion, ControlClient, InodeWriteback, ItemStore, Segment, SegmentWriter, StoreError};

/// A single item store can never hold more than this many dirty items or
/// bytes in one segment; `hold` rejects reservations above this.
pub const MAX_ITEMS_PER_SEGMENT: i64 = 64 * 1024;
pub const MAX_VALS_PER_SEGMENT: i64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
struct DirtyItem {
    key: u64,
    value: Vec<u8>,
}

/// An in-memory dirty-item set, keyed by `u64`.
#[derive(Default)]
pub struct MemoryItemStore {
    dirty: Mutex<Vec<DirtyItem>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` dirty with `value`, as a writer task would after a
    /// metadata update. Overwrites any existing dirty entry for the key.
    pub fn mark_dirty(&self, key: u64, value: Vec<u8>) {
        let mut dirty = self.dirty.lock().unwrap();
        if let Some(existing) = dirty.iter_mut().find(|d| d.key == key) {
            existing.value = value;
        } else {
            dirty.push(DirtyItem { key, value });
        }
    }

    /// Number of items currently dirty, for test assertions.
    pub fn dirty_len(&self) -> usize {
        self.dirty.lock().unwrap().len()
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    fn has_dirty(&self) -> bool {
        !self.dirty.lock().unwrap().is_empty()
    }

    fn fits_single(&self, items: i64, vals: i64) -> bool {
        items <= MAX_ITEMS_PER_SEGMENT && vals <= MAX_VALS_PER_SEGMENT
    }

    async fn drain_into(&self, segment: &mut Segment) -> Result<(), StoreError> {
        let drained: Vec<DirtyItem> = std::mem::take(&mut *self.dirty.lock().unwrap());
        for item in drained {
            segment.payload.extend_from_slice(&item.key.to_le_bytes());
            segment.payload.extend_from_slice(&(item.value.len() as u32).to_le_bytes());
            segment.payload.extend_from_slice(&item.value);
        }
        Ok(())
    }
}

/// An in-memory stand-in for inode writeback; just counts calls.
#[derive(Default)]
pub struct MemoryInodeWriteback {
    async_starts: AtomicU64,
    sync_starts: AtomicU64,
}

impl MemoryInodeWriteback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync_starts(&self) -> u64 {
        self.sync_starts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InodeWriteback for MemoryInodeWriteback {
    async fn start(&self, sync: bool) -> Result<(), StoreError> {
        if sync {
            self.sync_starts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.async_starts.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// An in-memory segment writer: "submitting" I/O just appends the segment
/// to a committed list immediately, so `wait` never actually blocks.
#[derive(Default)]
pub struct MemorySegmentWriter {
    committed: Mutex<Vec<(u64, Vec<u8>)>>,
    /// When set, the next `submit` call fails with this message instead of
    /// succeeding, for exercising the commit pipeline's error paths.
    fail_next_submit: Mutex<Option<String>>,
}

impl MemorySegmentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_submit(&self, message: impl Into<String>) {
        *self.fail_next_submit.lock().unwrap() = Some(message.into());
    }

    pub fn committed_segments(&self) -> Vec<(u64, Vec<u8>)> {
        self.committed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SegmentWriter for MemorySegmentWriter {
    async fn new_segment(&self, segno: u64) -> Segment {
        Segment {
            segno,
            payload: Vec::new(),
        }
    }

    async fn submit(&self, segment: &Segment, _completion: &Completion) -> Result<(), StoreError> {
        if let Some(message) = self.fail_next_submit.lock().unwrap().take() {
            return Err(StoreError::new(message));
        }
        self.committed
            .lock()
            .unwrap()
            .push((segment.segno, segment.payload.clone()));
        Ok(())
    }

    async fn wait(&self, _completion: &Completion) -> Result<(), StoreError> {
        Ok(())
    }

    fn total_bytes(&self, segment: &Segment) -> u64 {
        segment.payload.len() as u64
    }
}

/// An in-memory control plane: segment number allocation, a manifest of
/// recorded segments, and the global sequence counter.
#[derive(Default)]
pub struct MemoryControlClient {
    next_segno: AtomicU64,
    manifest: Mutex<Vec<(u64, u8)>>,
    fail_next_alloc: Mutex<Option<String>>,
}

impl MemoryControlClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_alloc(&self, message: impl Into<String>) {
        *self.fail_next_alloc.lock().unwrap() = Some(message.into());
    }

    pub fn manifest(&self) -> Vec<(u64, u8)> {
        self.manifest.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlClient for MemoryControlClient {
    async fn alloc_segno(&self) -> Result<u64, StoreError> {
        if let Some(message) = self.fail_next_alloc.lock().unwrap().take() {
            return Err(StoreError::new(message));
        }
        Ok(self.next_segno.fetch_add(1, Ordering::Relaxed))
    }

    async fn record_segment(&self, segment: &Segment, level: u8) -> Result<(), StoreError> {
        self.manifest.lock().unwrap().push((segment.segno, level));
        Ok(())
    }

    async fn advance_seq(&self, current_seq: &mut u64) -> Result<(), StoreError> {
        *current_seq += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_into_clears_dirty_set_and_writes_payload() {
        let store = MemoryItemStore::new();
        store.mark_dirty(1, vec![1, 2, 3]);
        store.mark_dirty(2, vec![4, 5]);
        assert!(store.has_dirty());

        let mut segment = Segment::default();
        store.drain_into(&mut segment).await.unwrap();

        assert!(!store.has_dirty());
        assert!(!segment.payload.is_empty());
    }

    #[tokio::test]
    async fn submit_honors_fail_next_submit() {
        let writer = MemorySegmentWriter::new();
        writer.fail_next_submit("disk full");
        let segment = writer.new_segment(7).await;
        let completion = Completion::default();
        let err = writer.submit(&segment, &completion).await.unwrap_err();
        assert_eq!(err.0, "disk full");

        // Next call succeeds and is recorded.
        writer.submit(&segment, &completion).await.unwrap();
        assert_eq!(writer.committed_segments().len(), 1);
    }

    #[tokio::test]
    async fn alloc_segno_increments() {
        let control = MemoryControlClient::new();
        let a = control.alloc_segno().await.unwrap();
        let b = control.alloc_segno().await.unwrap();
        assert_eq!(b, a + 1);
    }
}
