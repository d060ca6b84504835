// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Scoring: how hits get their numbers, and how numbers become tiers.
//!
//! Raw scores are accumulated term weights: each matched term contributes its
//! frequency times the weight of the field it landed in. Field weight
//! dominates frequency in practice — a title match on one term beats a
//! content match repeated a few times — which is what makes short feed
//! titles rank above long article bodies.
//!
//! The tiers (LOW/MEDIUM/HIGH) are relative to each result set, not
//! absolute; see `bucket.rs`.

mod bucket;

pub use bucket::{LowScoreFilter, RelevanceBucket, RelevanceTiers, SuppressedView};

use crate::types::FieldId;

// =============================================================================
// SCORING CONSTANTS
// =============================================================================

/// Weight of a term match in the title.
pub const TITLE_WEIGHT: f32 = 8.0;

/// Weight of a term match in the author field.
pub const AUTHOR_WEIGHT: f32 = 4.0;

/// Weight of a term match in a category.
pub const CATEGORY_WEIGHT: f32 = 4.0;

/// Weight of a term match in the link.
pub const LINK_WEIGHT: f32 = 2.0;

/// Weight of a term match in the content body — the baseline.
pub const CONTENT_WEIGHT: f32 = 1.0;

/// Flat contribution of a non-term condition match (state, exact value,
/// negation). Keeps every matched condition visible in the score without
/// letting structural criteria drown out text relevance.
pub const BASE_MATCH: f32 = 1.0;

/// Per-field term weight.
pub fn field_weight(field: FieldId) -> f32 {
    match field {
        FieldId::Title => TITLE_WEIGHT,
        FieldId::Author => AUTHOR_WEIGHT,
        FieldId::Category => CATEGORY_WEIGHT,
        FieldId::Link => LINK_WEIGHT,
        FieldId::Content => CONTENT_WEIGHT,
        FieldId::State | FieldId::Location => BASE_MATCH,
    }
}
