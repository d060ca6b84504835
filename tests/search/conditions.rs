//! ALL/ANY semantics, specifier behavior, and visibility filtering.

use lutra::{
    EntityState, FieldId, MatchMode, QueryExecutor, SearchCondition, Specifier,
};

use crate::common::{content_contains, hit_ids, query, seeded_index, title_contains};

#[test]
fn contains_on_title_finds_only_title_matches() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(vec![title_contains("release")], MatchMode::All))
        .unwrap();
    assert_eq!(hit_ids(&hits), vec![1, 4]);
}

#[test]
fn all_mode_intersects_conditions() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![
                title_contains("release"),
                SearchCondition::text(FieldId::Author, Specifier::Is, "core team"),
            ],
            MatchMode::All,
        ))
        .unwrap();
    assert_eq!(hit_ids(&hits), vec![1]);
}

#[test]
fn any_mode_unions_conditions() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![title_contains("security"), title_contains("roadmap")],
            MatchMode::Any,
        ))
        .unwrap();
    assert_eq!(hit_ids(&hits), vec![3, 5]);
}

#[test]
fn contains_not_excludes_matching_entities() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![SearchCondition::text(
                FieldId::Title,
                Specifier::ContainsNot,
                "release",
            )],
            MatchMode::All,
        ))
        .unwrap();
    // Everything visible except 1 and 4.
    assert_eq!(hit_ids(&hits), vec![2, 3, 5]);
}

#[test]
fn begins_with_and_ends_with_compare_whole_fields() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());

    let begins = executor
        .execute(&query(
            vec![SearchCondition::text(
                FieldId::Title,
                Specifier::BeginsWith,
                "stable",
            )],
            MatchMode::All,
        ))
        .unwrap();
    assert_eq!(hit_ids(&begins), vec![1]);

    let ends = executor
        .execute(&query(
            vec![SearchCondition::text(
                FieldId::Title,
                Specifier::EndsWith,
                "update",
            )],
            MatchMode::All,
        ))
        .unwrap();
    assert_eq!(hit_ids(&ends), vec![5]);
}

#[test]
fn state_conditions_read_the_cached_state() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![SearchCondition::states(
                Specifier::Is,
                [EntityState::Read],
            )],
            MatchMode::All,
        ))
        .unwrap();
    assert_eq!(hit_ids(&hits), vec![3]);
}

#[test]
fn invisible_entities_are_not_indexed_or_returned() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(vec![title_contains("hidden")], MatchMode::All))
        .unwrap();
    assert!(hits.is_empty());
    assert!(!fx.index.contains(lutra::EntityId(6)));
}

#[test]
fn title_matches_outscore_content_matches() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![title_contains("release"), content_contains("release")],
            MatchMode::Any,
        ))
        .unwrap();
    // Entity 1 matches in both title and content; entity 5 only in content.
    let score_of = |id: u64| {
        hits.iter()
            .find(|h| h.entity_id.get() == id)
            .map(|h| h.raw_score)
            .unwrap()
    };
    assert!(score_of(1) > score_of(5));
    // Hits come back ordered by score.
    assert!(hits.windows(2).all(|w| w[0].raw_score >= w[1].raw_score));
}

#[test]
fn executor_agrees_with_direct_condition_evaluation() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());

    let queries = vec![
        query(vec![title_contains("release")], MatchMode::All),
        query(
            vec![title_contains("release"), content_contains("patch")],
            MatchMode::Any,
        ),
        query(
            vec![
                SearchCondition::states(Specifier::Is, [EntityState::Unread]),
                content_contains("release"),
            ],
            MatchMode::All,
        ),
    ];

    for q in queries {
        let executed = hit_ids(&executor.execute(&q).unwrap());
        let mut direct: Vec<u64> = (1..=7)
            .filter_map(|id| fx.store.get(lutra::EntityId(id)))
            .filter(|e| e.state.is_visible() && q.matches(e))
            .map(|e| e.id.get())
            .collect();
        direct.sort_unstable();
        assert_eq!(executed, direct, "index and oracle disagree on {q:?}");
    }
}

#[test]
fn drifted_entities_are_skipped_counted_and_recoverable() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());

    // Entity 3 goes hidden in the store without a change notification.
    let mut drifted = fx.store.get(lutra::EntityId(3)).unwrap();
    drifted.state = EntityState::Hidden;
    fx.store.put(drifted);

    let q = query(vec![title_contains("security")], MatchMode::All);
    let hits = executor.execute(&q).unwrap();
    assert!(hits.is_empty());
    assert_eq!(fx.index.stats().integrity_signals, 1);

    // Explicitly asking for hidden entities still returns it.
    let with_hidden = executor.execute_with(&q, true).unwrap();
    assert_eq!(hit_ids(&with_hidden), vec![3]);
}
