// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Relevance bucketing: raw scores → LOW/MEDIUM/HIGH.
//!
//! The thresholds are thirds of the best score in the result set:
//! `medium = max/3`, `high = 2*max/3`, bucket by strict `>`. That makes the
//! classification relative — the same score can be HIGH in one result set
//! and LOW in another — and recomputed per query. The formula is a fixed
//! heuristic preserved as observed; changing it would change visible ranking
//! with nothing to justify the difference.
//!
//! [`LowScoreFilter`] is the one-shot suppression used on first display: it
//! hides the LOW bucket once, reports how many hits it hid so the caller can
//! say "N more hits filtered", then disarms itself so a re-render of the
//! same result set shows everything.

use crate::types::Hit;

/// Relevance tier of a hit, derived per result set and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelevanceBucket {
    Low,
    Medium,
    High,
}

/// Thresholds computed from one result set's score distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceTiers {
    max_score: f32,
    medium_threshold: f32,
    high_threshold: f32,
}

impl RelevanceTiers {
    /// Derive thresholds from a hit list. An empty list yields all-zero
    /// thresholds, under which every score lands in LOW.
    pub fn from_hits(hits: &[Hit]) -> Self {
        let max_score = hits.iter().map(|h| h.raw_score).fold(0.0_f32, f32::max);
        RelevanceTiers {
            max_score,
            medium_threshold: max_score / 3.0,
            high_threshold: 2.0 * max_score / 3.0,
        }
    }

    pub fn max_score(&self) -> f32 {
        self.max_score
    }

    /// Bucket a raw score. Strict inequalities, so the zero-score corner of
    /// an empty or single-score distribution degrades to LOW, never HIGH.
    pub fn bucket(&self, raw_score: f32) -> RelevanceBucket {
        if raw_score > self.high_threshold {
            RelevanceBucket::High
        } else if raw_score > self.medium_threshold {
            RelevanceBucket::Medium
        } else {
            RelevanceBucket::Low
        }
    }

    pub fn bucket_of(&self, hit: &Hit) -> RelevanceBucket {
        self.bucket(hit.raw_score)
    }
}

/// Result of applying the one-shot filter: what to show, what was hidden.
#[derive(Debug)]
pub struct SuppressedView<'a> {
    pub visible: Vec<&'a Hit>,
    /// Hits in the LOW bucket that were hidden — still counted so the UI can
    /// report them.
    pub suppressed: usize,
}

/// One-shot suppression of LOW-bucket hits on first display.
#[derive(Debug)]
pub struct LowScoreFilter {
    armed: bool,
}

impl Default for LowScoreFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LowScoreFilter {
    pub fn new() -> Self {
        LowScoreFilter { armed: true }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Apply the filter. Armed: LOW hits are withheld and counted, and the
    /// filter disarms. Disarmed: everything passes through, count is zero.
    pub fn apply<'a>(&mut self, hits: &'a [Hit], tiers: &RelevanceTiers) -> SuppressedView<'a> {
        if !self.armed {
            return SuppressedView {
                visible: hits.iter().collect(),
                suppressed: 0,
            };
        }
        self.armed = false;

        let mut visible = Vec::with_capacity(hits.len());
        let mut suppressed = 0;
        for hit in hits {
            if tiers.bucket_of(hit) == RelevanceBucket::Low {
                suppressed += 1;
            } else {
                visible.push(hit);
            }
        }
        SuppressedView {
            visible,
            suppressed,
        }
    }
}
