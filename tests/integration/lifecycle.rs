//! Startup idempotence, shutdown modes, recovery, pending flags.

use std::fs;
use std::sync::Arc;

use lutra::{
    EntityResolver, Error, MatchMode, QueryExecutor, SearchIndex,
};
use tempfile::TempDir;

use crate::common::{hit_ids, query, seeded_index, seeded_store, title_contains};

#[test]
fn operations_before_startup_are_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store();
    let index = SearchIndex::new(dir.path(), store.clone() as Arc<dyn EntityResolver>);

    let entity = store.resolve(lutra::EntityId(1)).unwrap();
    assert!(matches!(index.index(&entity), Err(Error::IndexUnavailable)));
    assert!(matches!(
        QueryExecutor::new(index.clone())
            .execute(&query(vec![title_contains("x")], MatchMode::All)),
        Err(Error::IndexUnavailable)
    ));
}

#[test]
fn startup_is_idempotent() {
    let fx = seeded_index();
    let entries_before = fx.index.stats().entry_count;
    fx.index.startup().unwrap();
    fx.index.startup().unwrap();
    assert_eq!(fx.index.stats().entry_count, entries_before);
}

#[test]
fn a_clean_shutdown_round_trips_the_index() {
    let fx = seeded_index();
    let q = query(vec![title_contains("release")], MatchMode::All);
    let before = hit_ids(&QueryExecutor::new(fx.index.clone()).execute(&q).unwrap());

    fx.index.shutdown(false).unwrap();
    // Shutdown is idempotent too.
    fx.index.shutdown(false).unwrap();

    // A new instance over the same directory restores the same entries from
    // the snapshot, with no reindex needed.
    let reopened = SearchIndex::new(
        fx.dir.path(),
        fx.store.clone() as Arc<dyn EntityResolver>,
    );
    reopened.startup().unwrap();
    assert_eq!(reopened.pending_flags(), (false, false));
    let after = hit_ids(&QueryExecutor::new(reopened.clone()).execute(&q).unwrap());
    assert_eq!(before, after);
}

#[test]
fn an_emergency_shutdown_schedules_cleanup_on_next_startup() {
    let fx = seeded_index();
    fx.index.shutdown(true).unwrap();

    // The dirty marker survived, so the next startup runs a cleanup. With a
    // healthy store that is a no-op sweep, and the flag ends cleared.
    let reopened = SearchIndex::new(
        fx.dir.path(),
        fx.store.clone() as Arc<dyn EntityResolver>,
    );
    reopened.startup().unwrap();
    assert_eq!(reopened.pending_flags(), (false, false));
}

#[test]
fn a_corrupt_snapshot_triggers_a_full_rebuild() {
    let fx = seeded_index();
    fx.index.shutdown(false).unwrap();

    // Flip bits in the snapshot.
    let snapshot = fx.dir.path().join("snapshot.lutra");
    let mut raw = fs::read_to_string(&snapshot).unwrap();
    raw.push_str("garbage");
    fs::write(&snapshot, raw).unwrap();

    let reopened = SearchIndex::new(
        fx.dir.path(),
        fx.store.clone() as Arc<dyn EntityResolver>,
    );
    reopened.startup().unwrap();

    // The rebuild repopulated from the resolver and cleared the flag.
    assert_eq!(reopened.pending_flags(), (false, false));
    assert_eq!(reopened.stats().entry_count, 5);
}

#[test]
fn deferred_flags_are_honored_once() {
    let fx = seeded_index();

    // Orphan an entry: the entity disappears from the store with no change
    // notification, then a cleanup is deferred to the next startup.
    fx.store.evict(lutra::EntityId(3));
    fx.index.clean_up_on_next_startup().unwrap();
    assert_eq!(fx.index.pending_flags(), (false, true));

    // No effect on the current session.
    assert!(fx.index.contains(lutra::EntityId(3)));

    fx.index.shutdown(false).unwrap();
    let reopened = SearchIndex::new(
        fx.dir.path(),
        fx.store.clone() as Arc<dyn EntityResolver>,
    );
    reopened.startup().unwrap();

    assert!(!reopened.contains(lutra::EntityId(3)));
    assert_eq!(reopened.pending_flags(), (false, false));
}
