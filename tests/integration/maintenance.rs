//! Background maintenance: rebuild, sweep, cancellation, exclusivity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::Arc;

use lutra::{
    CancelToken, EntityId, Error, MaintenanceOutcome, NoProgress, Progress,
};

use crate::common::{bulk_store, indexed, seeded_index};

/// Progress sink that cancels its token after a given number of units.
struct CancelAfter {
    token: CancelToken,
    after: u64,
    seen: AtomicU64,
}

impl Progress for CancelAfter {
    fn begin(&self, _total: u64) {}
    fn advance(&self, units: u64) {
        if self.seen.fetch_add(units, Ordering::Relaxed) + units >= self.after {
            self.token.cancel();
        }
    }
    fn message(&self, _text: &str) {}
    fn done(&self) {}
}

#[test]
fn reindex_rebuilds_what_incremental_indexing_built() {
    let fx = seeded_index();
    let before = fx.index.stats();

    let handle = fx
        .index
        .spawn_reindex_all(Arc::new(NoProgress), CancelToken::new())
        .unwrap();
    let outcome = handle.join().unwrap();

    assert!(matches!(outcome, MaintenanceOutcome::Completed { processed: 7 }));
    let after = fx.index.stats();
    assert_eq!(after.entry_count, before.entry_count);
    assert_eq!(after.term_count, before.term_count);
}

#[test]
fn canceled_reindex_leaves_a_usable_index_and_a_pending_flag() {
    let fx = indexed(bulk_store(500));
    let token = CancelToken::new();
    let progress = Arc::new(CancelAfter {
        token: token.clone(),
        after: 100,
        seen: AtomicU64::new(0),
    });

    let handle = fx.index.spawn_reindex_all(progress, token).unwrap();
    let outcome = handle.join().unwrap();

    match outcome {
        MaintenanceOutcome::Canceled { processed } => {
            assert!(processed < 500, "cancel should land well before the end");
        }
        other => panic!("expected cancellation, got {other:?}"),
    }

    // Partially rebuilt but fully usable, and marked for completion.
    assert_eq!(fx.index.pending_flags(), (true, false));
    assert!(fx.index.is_open());
    assert!(fx.index.stats().entry_count < 500);
}

#[test]
fn cleanup_removes_orphans_without_clearing_the_rest() {
    let fx = indexed(bulk_store(50));

    // Bulk-delete a slice of entities behind the index's back.
    for id in 10..20 {
        fx.store.evict(EntityId(id));
    }
    assert_eq!(fx.index.stats().entry_count, 50);

    let handle = fx
        .index
        .spawn_clean_up(Arc::new(NoProgress), CancelToken::new())
        .unwrap();
    let outcome = handle.join().unwrap();

    assert!(matches!(outcome, MaintenanceOutcome::Completed { processed: 50 }));
    assert_eq!(fx.index.stats().entry_count, 40);
    assert!(!fx.index.contains(EntityId(15)));
    assert!(fx.index.contains(EntityId(5)));
    assert_eq!(fx.index.pending_flags(), (false, false));
}

#[test]
fn concurrent_maintenance_is_rejected_not_interleaved() {
    let fx = indexed(bulk_store(200));

    // Hold the first pass inside its loop so the second request overlaps it.
    struct Gate {
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
        started: std::sync::mpsc::SyncSender<()>,
    }
    impl Progress for Gate {
        fn begin(&self, _total: u64) {
            let _ = self.started.send(());
            let _ = self.release.lock().unwrap().recv();
        }
        fn advance(&self, _units: u64) {}
        fn message(&self, _text: &str) {}
        fn done(&self) {}
    }

    let (started_tx, started_rx) = sync_channel(1);
    let (release_tx, release_rx) = sync_channel(1);
    let handle = fx
        .index
        .spawn_reindex_all(
            Arc::new(Gate {
                release: std::sync::Mutex::new(release_rx),
                started: started_tx,
            }),
            CancelToken::new(),
        )
        .unwrap();

    started_rx.recv().unwrap();
    assert!(matches!(
        fx.index.spawn_clean_up(Arc::new(NoProgress), CancelToken::new()),
        Err(Error::MaintenanceBusy)
    ));
    assert!(matches!(
        fx.index.spawn_reindex_all(Arc::new(NoProgress), CancelToken::new()),
        Err(Error::MaintenanceBusy)
    ));

    release_tx.send(()).unwrap();
    handle.join().unwrap();

    // The token is free again once the pass finishes.
    let again = fx
        .index
        .spawn_clean_up(Arc::new(NoProgress), CancelToken::new())
        .unwrap();
    again.join().unwrap();
}

#[test]
fn optimize_compacts_without_losing_entries() {
    let fx = indexed(bulk_store(10));
    for id in 1..=5 {
        fx.index.remove(EntityId(id)).unwrap();
    }
    fx.index.optimize().unwrap();
    let stats = fx.index.stats();
    assert_eq!(stats.entry_count, 5);
    assert!(fx.index.contains(EntityId(7)));
    assert!(!fx.index.contains(EntityId(2)));
}
