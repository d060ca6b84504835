//! Chunked, cancelable, idempotent batch execution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lutra::rules::{
    Action, ActionRegistry, BatchOutcome, BatchRuleExecutor, Rule, DELETE, MARK_READ,
    MOVE_TO_CONTAINER, NOTIFY,
};
use lutra::{
    CancelToken, ContainerId, EntityId, EntityResolver, EntityState, Hit, MatchMode, Progress,
    QueryExecutor,
};

use crate::common::{bulk_store, indexed, query, title_contains};

/// Progress sink that counts begin/advance/done calls.
#[derive(Default)]
struct CountingProgress {
    total: AtomicU64,
    advances: AtomicU64,
    done: AtomicU64,
}

impl Progress for CountingProgress {
    fn begin(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }
    fn advance(&self, units: u64) {
        self.advances.fetch_add(units, Ordering::Relaxed);
    }
    fn message(&self, _text: &str) {}
    fn done(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }
}

fn rule_with(actions: Vec<Action>) -> Rule {
    Rule {
        id: 1,
        name: "batch rule".into(),
        query: None,
        match_all: true,
        enabled: true,
        order: 0,
        actions,
    }
}

fn hits_for(store: &Arc<lutra::InMemoryStore>) -> Vec<Hit> {
    store
        .entity_ids()
        .into_iter()
        .filter_map(|id| store.get(id))
        .filter(|e| e.state.is_visible())
        .map(|e| Hit::new(e.id, 1.0, e.state))
        .collect()
}

#[test]
fn progress_advances_once_per_chunk() {
    let chunk_size = 10;
    let count = 3 * chunk_size + 7; // 37 hits → 4 chunks
    let store = bulk_store(count as u64);
    let executor = BatchRuleExecutor::new(
        store.clone(),
        store.clone(),
        Arc::new(ActionRegistry::with_defaults()),
    )
    .with_chunk_size(chunk_size);

    let progress = Arc::new(CountingProgress::default());
    let outcome = executor
        .run(
            &rule_with(vec![Action::new(MARK_READ)]),
            &hits_for(&store),
            progress.as_ref(),
            &CancelToken::new(),
        )
        .unwrap();

    let expected_chunks = count.div_ceil(chunk_size) as u64;
    assert_eq!(progress.total.load(Ordering::Relaxed), expected_chunks);
    assert_eq!(progress.advances.load(Ordering::Relaxed), expected_chunks);
    assert_eq!(progress.done.load(Ordering::Relaxed), 1);
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            persisted: count,
            skipped: 0,
            chunks: expected_chunks,
        }
    );
}

#[test]
fn the_canonical_forced_apply_scenario() {
    // 120 matching hits, chunk size 50, one entity deleted behind the
    // index's back: 3 chunks, 119 persisted into the bin, 1 skip, success.
    let fx = indexed(bulk_store(120));
    let hits = QueryExecutor::new(fx.index.clone())
        .execute(&query(vec![title_contains("release")], MatchMode::All))
        .unwrap();
    assert_eq!(hits.len(), 120);

    fx.store.evict(EntityId(60));

    let registry = Arc::new(ActionRegistry::with_defaults());
    let executor = BatchRuleExecutor::new(fx.store.clone(), fx.store.clone(), registry)
        .with_chunk_size(50);
    let bin = 777u64;
    let rule = rule_with(vec![Action::with_data(
        MOVE_TO_CONTAINER,
        serde_json::json!({ "container": bin }),
    )]);

    let progress = Arc::new(CountingProgress::default());
    let outcome = executor
        .run(&rule, &hits, progress.as_ref(), &CancelToken::new())
        .unwrap();

    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            persisted: 119,
            skipped: 1,
            chunks: 3,
        }
    );

    let moved = fx
        .store
        .entity_ids()
        .into_iter()
        .filter_map(|id| fx.store.get(id))
        .filter(|e| e.parent() == Some(ContainerId(bin)))
        .count();
    assert_eq!(moved, 119);
}

#[test]
fn rules_without_forcible_actions_are_nothing_to_run() {
    let store = bulk_store(5);
    let executor = BatchRuleExecutor::new(
        store.clone(),
        store.clone(),
        Arc::new(ActionRegistry::with_defaults()),
    );
    let outcome = executor
        .run(
            &rule_with(vec![Action::new(NOTIFY)]),
            &hits_for(&store),
            &CountingProgress::default(),
            &CancelToken::new(),
        )
        .unwrap();
    assert_eq!(outcome, BatchOutcome::NothingToRun);
    // Nothing was touched.
    assert!(store
        .entity_ids()
        .into_iter()
        .filter_map(|id| store.get(id))
        .all(|e| e.state == EntityState::Unread));
}

#[test]
fn cancellation_is_chunk_atomic() {
    let store = bulk_store(40);
    let executor = BatchRuleExecutor::new(
        store.clone(),
        store.clone(),
        Arc::new(ActionRegistry::with_defaults()),
    )
    .with_chunk_size(10);

    // A token that is already canceled stops the run before any chunk.
    let token = CancelToken::new();
    token.cancel();
    let outcome = executor
        .run(
            &rule_with(vec![Action::new(MARK_READ)]),
            &hits_for(&store),
            &CountingProgress::default(),
            &token,
        )
        .unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::Canceled {
            persisted: 0,
            skipped: 0,
            chunks: 0,
        }
    );
    assert!(store
        .entity_ids()
        .into_iter()
        .filter_map(|id| store.get(id))
        .all(|e| e.state == EntityState::Unread));
}

#[test]
fn duplicate_hits_see_the_replacement_not_the_original() {
    let store = bulk_store(2);
    let registry = Arc::new(ActionRegistry::with_defaults());
    let executor = BatchRuleExecutor::new(store.clone(), store.clone(), registry)
        .with_chunk_size(1);

    // The same entity appears in two chunks; the second chunk must see the
    // already-moved version and leave it alone.
    let hits = vec![
        Hit::new(EntityId(1), 1.0, EntityState::Unread),
        Hit::new(EntityId(1), 1.0, EntityState::Unread),
    ];
    let rule = rule_with(vec![Action::with_data(
        MOVE_TO_CONTAINER,
        serde_json::json!({ "container": 9 }),
    )]);

    let outcome = executor
        .run(&rule, &hits, &CountingProgress::default(), &CancelToken::new())
        .unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            persisted: 1,
            skipped: 0,
            chunks: 2,
        }
    );
    assert_eq!(
        store.get(EntityId(1)).unwrap().parent(),
        Some(ContainerId(9))
    );
}

#[test]
fn forcible_run_is_idempotent() {
    let store = bulk_store(20);
    let registry = Arc::new(ActionRegistry::with_defaults());
    let executor = BatchRuleExecutor::new(store.clone(), store.clone(), registry);
    let rule = rule_with(vec![Action::new(MARK_READ)]);

    let first = executor
        .run(
            &rule,
            &hits_for(&store),
            &CountingProgress::default(),
            &CancelToken::new(),
        )
        .unwrap();
    assert!(matches!(
        first,
        BatchOutcome::Completed { persisted: 20, .. }
    ));

    // Second pass finds the work already done: nothing changes, so nothing
    // is persisted.
    let second = executor
        .run(
            &rule,
            &hits_for(&store),
            &CountingProgress::default(),
            &CancelToken::new(),
        )
        .unwrap();
    assert!(matches!(
        second,
        BatchOutcome::Completed { persisted: 0, .. }
    ));
}

#[test]
fn conflicting_ad_hoc_actions_drop_the_later_one() {
    let store = bulk_store(3);
    let registry = Arc::new(ActionRegistry::with_defaults());
    let executor = BatchRuleExecutor::new(store.clone(), store.clone(), registry);

    // A rule value built outside the store can carry a conflict; the earlier
    // action wins.
    let rule = rule_with(vec![Action::new(DELETE), Action::new(MOVE_TO_CONTAINER)]);
    let outcome = executor
        .run(
            &rule,
            &hits_for(&store),
            &CountingProgress::default(),
            &CancelToken::new(),
        )
        .unwrap();
    assert!(matches!(outcome, BatchOutcome::Completed { persisted: 3, .. }));
    assert!(store
        .entity_ids()
        .into_iter()
        .filter_map(|id| store.get(id))
        .all(|e| e.state == EntityState::Deleted));
}
