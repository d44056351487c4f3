use std::sync::Arc;
use std::time::Duration;

use txn_core::{writer_scope, ItemCount, TxnConfig, TxnError};
use txn_store::{MemoryControlClient, MemoryInodeWriteback, MemoryItemStore, MemorySegmentWriter};

fn new_core(item_store: Arc<MemoryItemStore>) -> txn_core::TxnCore {
    txn_core::setup(
        item_store,
        Arc::new(MemoryInodeWriteback::new()),
        Arc::new(MemorySegmentWriter::new()),
        Arc::new(MemoryControlClient::new()),
        TxnConfig::default().with_sync_delay(Duration::from_secs(60)),
    )
}

#[tokio::test]
async fn hold_track_release_then_sync_commits() {
    let item_store = Arc::new(MemoryItemStore::new());
    let core = new_core(item_store.clone());

    writer_scope(async {
        let reservation = core.manager.hold(ItemCount::new(1, 16)).await.unwrap();
        item_store.mark_dirty(42, vec![0xAB; 16]);
        core.manager.track(ItemCount::new(1, 16)).unwrap();
        core.manager.release(reservation);
    })
    .await;

    core.sync_gate.sync(true).await.unwrap();

    let snapshot = core.metrics.snapshot();
    assert_eq!(snapshot.trans_commit_full, 0);
    assert_eq!(snapshot.trans_level0_seg_writes, 1);
    assert!(!item_store.has_dirty());

    core.request_shutdown();
    core.join().await;
}

#[tokio::test]
async fn hold_rejects_reservation_too_large_for_a_segment() {
    let core = new_core(Arc::new(MemoryItemStore::new()));

    let result = writer_scope(async {
        core.manager
            .hold(ItemCount::new(txn_store::MAX_ITEMS_PER_SEGMENT + 1, 0))
            .await
    })
    .await;

    assert!(matches!(result, Err(TxnError::InvalidArgument(_))));

    core.request_shutdown();
    core.join().await;
}

#[tokio::test]
async fn currently_held_is_zero_until_a_hold_is_outstanding() {
    let core = new_core(Arc::new(MemoryItemStore::new()));

    writer_scope(async {
        assert_eq!(core.manager.currently_held(), ItemCount::ZERO);

        let reservation = core.manager.hold(ItemCount::new(2, 32)).await.unwrap();
        assert_eq!(core.manager.currently_held(), ItemCount::new(2, 32));

        core.manager.release(reservation);
        assert_eq!(core.manager.currently_held(), ItemCount::ZERO);
    })
    .await;

    core.request_shutdown();
    core.join().await;
}

#[tokio::test]
async fn reentrant_hold_by_the_same_actor_nests() {
    let core = new_core(Arc::new(MemoryItemStore::new()));

    writer_scope(async {
        let outer = core.manager.hold(ItemCount::new(1, 8)).await.unwrap();
        let inner = core.manager.hold(ItemCount::new(1, 8)).await.unwrap();
        assert_eq!(core.manager.currently_held(), ItemCount::new(2, 16));

        core.manager.release(inner);
        assert_eq!(core.manager.currently_held(), ItemCount::new(1, 8));
        core.manager.release(outer);
        assert_eq!(core.manager.currently_held(), ItemCount::ZERO);
    })
    .await;

    core.request_shutdown();
    core.join().await;
}

#[tokio::test]
async fn a_failed_pipeline_step_surfaces_through_sync() {
    let item_store = Arc::new(MemoryItemStore::new());
    let segment_writer = Arc::new(MemorySegmentWriter::new());
    segment_writer.fail_next_submit("simulated disk full");

    let core = txn_core::setup(
        item_store.clone(),
        Arc::new(MemoryInodeWriteback::new()),
        segment_writer,
        Arc::new(MemoryControlClient::new()),
        TxnConfig::default().with_sync_delay(Duration::from_secs(60)),
    );

    writer_scope(async {
        let reservation = core.manager.hold(ItemCount::new(1, 4)).await.unwrap();
        item_store.mark_dirty(1, vec![1, 2, 3, 4]);
        core.manager.track(ItemCount::new(1, 4)).unwrap();
        core.manager.release(reservation);
    })
    .await;

    let result = core.sync_gate.sync(true).await;
    assert!(matches!(result, Err(TxnError::Io { .. })));

    core.request_shutdown();
    core.join().await;
}

#[tokio::test]
async fn shutdown_interrupts_a_hold_call() {
    let core = new_core(Arc::new(MemoryItemStore::new()));
    core.request_shutdown();

    let result = writer_scope(async { core.manager.hold(ItemCount::new(1, 1)).await }).await;
    assert!(matches!(result, Err(TxnError::Interrupted)));

    core.join().await;
}

/// Boundary scenario 3: a hold that would push the manager's summed
/// reservation past what a single segment can fit is denied (and counted)
/// rather than admitted, and only becomes admissible once the outstanding
/// holder releases.
#[tokio::test]
async fn capacity_denial_blocks_until_release_then_admits() {
    let core = new_core(Arc::new(MemoryItemStore::new()));
    let manager = core.manager.clone();

    let big = ItemCount::new(txn_store::MAX_ITEMS_PER_SEGMENT - 10, 0);
    let small = ItemCount::new(20, 0);

    let big_reservation = writer_scope(manager.hold(big)).await.unwrap();

    let waiter_manager = manager.clone();
    let waiter = tokio::spawn(writer_scope(async move {
        waiter_manager.hold(small).await.unwrap()
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished());
    assert!(core.metrics.snapshot().trans_commit_full >= 1);

    manager.release(big_reservation);

    let small_reservation = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be admitted once capacity is released")
        .unwrap();
    manager.release(small_reservation);

    core.request_shutdown();
    core.join().await;
}

/// Boundary scenario 1: the deadline timer fires with nothing dirty. The
/// commit core still advances its sequence number (so the timer counter
/// moves), but allocates no segment and records nothing in the manifest.
#[tokio::test]
async fn empty_commit_at_deadline_allocates_no_segment() {
    let control = Arc::new(MemoryControlClient::new());
    let core = txn_core::setup(
        Arc::new(MemoryItemStore::new()),
        Arc::new(MemoryInodeWriteback::new()),
        Arc::new(MemorySegmentWriter::new()),
        control.clone(),
        TxnConfig::default().with_sync_delay(Duration::from_millis(30)),
    );

    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshot = core.metrics.snapshot();
    assert!(snapshot.trans_commit_timer >= 1);
    assert_eq!(snapshot.trans_level0_seg_writes, 0);
    assert!(control.manifest().is_empty());

    core.request_shutdown();
    core.join().await;
}
