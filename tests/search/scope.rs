//! Scope conditions: hard restriction, recursion, conflict warnings.

use lutra::{
    ContainerId, MatchMode, Query, QueryExecutor, QueryWarning, SearchCondition,
};

use crate::common::{hit_ids, query, seeded_index, title_contains};

#[test]
fn non_recursive_scope_checks_the_direct_parent() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![
                title_contains("release"),
                SearchCondition::scope([ContainerId(2)], false),
            ],
            MatchMode::All,
        ))
        .unwrap();
    assert_eq!(hit_ids(&hits), vec![4]);
}

#[test]
fn recursive_scope_walks_the_ancestor_chain() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![
                title_contains("release"),
                SearchCondition::scope([ContainerId(1)], true),
            ],
            MatchMode::All,
        ))
        .unwrap();
    // Entity 4 lives in 2-inside-1, so the recursive scope admits it.
    assert_eq!(hit_ids(&hits), vec![1, 4]);
}

#[test]
fn scope_is_a_hard_must_even_in_any_mode() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![
                title_contains("roadmap"),
                title_contains("security"),
                SearchCondition::scope([ContainerId(2)], false),
            ],
            MatchMode::Any,
        ))
        .unwrap();
    // "Security Advisory" matches an alternative but sits outside the scope;
    // the scope never counts as one of the ANY alternatives.
    assert_eq!(hit_ids(&hits), vec![5]);
}

#[test]
fn scope_only_queries_return_the_container_contents() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let q = Query::scope_only(SearchCondition::scope([ContainerId(2)], false)).unwrap();
    let hits = executor.execute(&q).unwrap();
    assert_eq!(hit_ids(&hits), vec![4, 5]);
}

#[test]
fn overlapping_location_condition_draws_a_warning() {
    let (_query, warnings) = Query::build(
        vec![
            SearchCondition::location_is([ContainerId(2)], false),
            SearchCondition::scope([ContainerId(2)], true),
        ],
        MatchMode::All,
    )
    .unwrap();
    assert_eq!(
        warnings,
        vec![QueryWarning::LocationConflict {
            container: ContainerId(2)
        }]
    );
}
