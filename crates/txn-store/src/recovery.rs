//! Recovery-to-store bridge: replays a previously recorded dirty set back
//! into a fresh [`MemoryItemStore`] so the first commit after a restart
//! sees the same dirty items a crashed mount would have held.
//!
//! Parsing an on-disk recovery log is out of scope here; this only covers
//! the handoff from "a recovered dirty set, how ever it was read back" to
//! "an `ItemStore` a fresh `Committer` can drive."

use crate::memory::MemoryItemStore;

/// One previously-dirty item as it would be read back from a recovery log.
#[derive(Debug, Clone)]
pub struct RecoveredItem {
    pub key: u64,
    pub value: Vec<u8>,
}

pub struct RecoveryBridge;

impl RecoveryBridge {
    /// Pushes every recovered item back into `store` as dirty, in order.
    pub fn replay(dirty: Vec<RecoveredItem>, store: &MemoryItemStore) {
        for item in dirty {
            store.mark_dirty(item.key, item.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_marks_every_recovered_item_dirty() {
        let store = MemoryItemStore::new();
        let dirty = vec![
            RecoveredItem { key: 1, value: vec![1] },
            RecoveredItem { key: 2, value: vec![2, 2] },
        ];
        RecoveryBridge::replay(dirty, &store);
        assert_eq!(store.dirty_len(), 2);
    }
}
