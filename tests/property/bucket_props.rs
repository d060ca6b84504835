//! Bucketing invariants over arbitrary score distributions.

use lutra::{EntityId, EntityState, Hit, RelevanceBucket, RelevanceTiers};
use proptest::prelude::*;

fn hits_strategy() -> impl Strategy<Value = Vec<Hit>> {
    prop::collection::vec(0.0f32..1000.0, 0..40).prop_map(|scores| {
        scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| Hit::new(EntityId(i as u64), score, EntityState::Unread))
            .collect()
    })
}

proptest! {
    /// A better score never lands in a strictly lower tier.
    #[test]
    fn bucketing_is_monotone_in_score(hits in hits_strategy()) {
        let tiers = RelevanceTiers::from_hits(&hits);
        for a in &hits {
            for b in &hits {
                if a.raw_score > b.raw_score {
                    prop_assert!(tiers.bucket_of(a) >= tiers.bucket_of(b));
                }
            }
        }
    }

    /// Scaling every score by a positive factor never changes any bucket:
    /// the classification is relative, not absolute. Powers of two keep the
    /// scaling exact in f32, so the comparison is not at the mercy of
    /// last-ulp rounding at a threshold.
    #[test]
    fn bucketing_is_scale_invariant(hits in hits_strategy(), exponent in -8i32..8) {
        let factor = 2f32.powi(exponent);
        let tiers = RelevanceTiers::from_hits(&hits);
        let scaled: Vec<Hit> = hits
            .iter()
            .map(|h| Hit::new(h.entity_id, h.raw_score * factor, h.cached_state))
            .collect();
        let scaled_tiers = RelevanceTiers::from_hits(&scaled);
        for (original, scaled) in hits.iter().zip(&scaled) {
            prop_assert_eq!(
                tiers.bucket_of(original),
                scaled_tiers.bucket_of(scaled)
            );
        }
    }

    /// The best hit of a non-trivial result set is always HIGH.
    #[test]
    fn the_top_score_is_high(hits in hits_strategy()) {
        let tiers = RelevanceTiers::from_hits(&hits);
        if tiers.max_score() > 0.0 {
            let best = hits
                .iter()
                .max_by(|a, b| a.raw_score.partial_cmp(&b.raw_score).unwrap())
                .unwrap();
            prop_assert_eq!(tiers.bucket_of(best), RelevanceBucket::High);
        }
    }
}
