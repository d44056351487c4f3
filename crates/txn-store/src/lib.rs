//! Reference in-memory implementations of the `txn-core` collaborator
//! traits (`ItemStore`, `InodeWriteback`, `SegmentWriter`, `ControlClient`)
//! plus a recovery-to-store bridge. Exists so `txn-core`'s own tests and
//! `txn-sim`'s simulation have something concrete to drive; it is not a
//! claim about how a real segment store or control plane works.

mod memory;
mod recovery;

pub use memory::{
    MemoryControlClient, MemoryInodeWriteback, MemoryItemStore, MemorySegmentWriter,
    MAX_ITEMS_PER_SEGMENT, MAX_VALS_PER_SEGMENT,
};
pub use recovery::{RecoveredItem, RecoveryBridge};
