//! Relevance bucketing over real result sets.

use lutra::{LowScoreFilter, MatchMode, QueryExecutor, RelevanceBucket, RelevanceTiers};

use crate::common::{content_contains, query, seeded_index, title_contains};

#[test]
fn buckets_are_relative_to_the_result_set() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![title_contains("release"), content_contains("release")],
            MatchMode::Any,
        ))
        .unwrap();
    let tiers = RelevanceTiers::from_hits(&hits);

    // The best hit is always HIGH: its score exceeds 2/3 of itself.
    assert_eq!(tiers.bucket_of(&hits[0]), RelevanceBucket::High);
    // Content-only matches sit far below the title+content leader.
    let weakest = hits.last().unwrap();
    assert_eq!(tiers.bucket_of(weakest), RelevanceBucket::Low);
}

#[test]
fn one_shot_filter_reports_then_disarms() {
    let fx = seeded_index();
    let executor = QueryExecutor::new(fx.index.clone());
    let hits = executor
        .execute(&query(
            vec![title_contains("release"), content_contains("release")],
            MatchMode::Any,
        ))
        .unwrap();
    let tiers = RelevanceTiers::from_hits(&hits);
    let low_count = hits
        .iter()
        .filter(|h| tiers.bucket_of(h) == RelevanceBucket::Low)
        .count();
    assert!(low_count > 0, "fixture should produce low-tier hits");

    let mut filter = LowScoreFilter::new();
    let first = filter.apply(&hits, &tiers);
    assert_eq!(first.suppressed, low_count);
    assert_eq!(first.visible.len() + first.suppressed, hits.len());

    // Re-rendering the same result set shows everything.
    let second = filter.apply(&hits, &tiers);
    assert_eq!(second.suppressed, 0);
    assert_eq!(second.visible.len(), hits.len());
}
