// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Text normalization and tokenization for the index.
//!
//! Both sides of a search go through the same pipeline: entity fields at
//! index time, condition values at query time. If the two ever diverge, terms
//! stop matching themselves, so keep this the single entry point.
//!
//! Normalization is NFD decomposition, combining-mark removal, lowercasing,
//! and whitespace collapsing. That makes "Café" and "cafe" the same term,
//! which is what a human typing into a search box expects.

use unicode_normalization::UnicodeNormalization;

/// Words too common to carry signal. Filtered at index and query time alike;
/// a condition value consisting only of stop words matches nothing rather
/// than everything.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "of",
    "on", "or", "that", "the", "to", "was", "with",
];

/// Normalize a string for search: NFD, strip diacritics, lowercase, collapse
/// whitespace.
///
/// - "Café au Lait" → "cafe au lait"
/// - "naïve  text" → "naive text"
pub fn normalize(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check if a character is a combining mark (diacritic).
///
/// Combining marks have Unicode category "Mn" (Mark, Nonspacing).
fn is_combining_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}' |  // Combining Diacritical Marks
        '\u{1DC0}'..='\u{1DFF}' |  // Combining Diacritical Marks Supplement
        '\u{20D0}'..='\u{20FF}' |  // Combining Diacritical Marks for Symbols
        '\u{FE20}'..='\u{FE2F}'    // Combining Half Marks
    )
}

/// Word boundary detection: any non-alphanumeric character separates terms.
#[inline]
fn is_word_boundary(c: char) -> bool {
    !c.is_alphanumeric()
}

/// Split text into normalized index terms, stop words removed.
///
/// The input does not need to be pre-normalized; tokenize always normalizes
/// first, and normalization is idempotent, so tokenizing a stored normalized
/// field yields the same terms as tokenizing the original text.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(is_word_boundary)
        .filter(|t| !t.is_empty() && !STOP_WORDS.contains(t))
        .map(str::to_owned)
        .collect()
}

/// Tokenize a query value, keeping stop words out but preserving order.
///
/// Identical to [`tokenize`] today; a separate entry point so query-side
/// behavior (e.g. phrase handling) can diverge without touching index-side
/// code.
pub fn tokenize_query(text: &str) -> Vec<String> {
    tokenize(text)
}
