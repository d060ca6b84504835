// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Index entries and posting lists.
//!
//! One [`IndexEntry`] per indexed entity, keyed by entity id; one
//! [`PostingList`] per term, mapping entity → per-field term frequencies.
//! The entry keeps its own term table so removal is O(terms-of-entity)
//! instead of a full posting scan.
//!
//! # Invariants
//!
//! 1. **ENTRY_POSTING_AGREEMENT**: every `(term, field, count)` in an entry's
//!    term table has a matching posting, and vice versa. `SearchIndex`
//!    maintains this by always applying entry insert/remove as a pair.
//! 2. **VISIBLE_ONLY**: entries exist only for entities whose state is in the
//!    visible set at indexing time. An entity that becomes invisible is
//!    removed, not updated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ContainerId, Entity, EntityId, EntityState, FieldId};

use super::tokenizer::{normalize, tokenize};

/// Per-field occurrence counts of one term within one entity.
pub(crate) type FieldCounts = HashMap<FieldId, u32>;

/// All occurrences of one term across the corpus.
#[derive(Debug, Default)]
pub(crate) struct PostingList {
    pub by_entity: HashMap<EntityId, FieldCounts>,
}

impl PostingList {
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}

/// The index's record of one entity.
///
/// Serialized as-is into the snapshot; the term table is rebuilt from the
/// normalized field values on load (tokenization is deterministic and
/// idempotent over normalized text, so the rebuild is exact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IndexEntry {
    pub state: EntityState,
    pub location: Vec<ContainerId>,
    /// Normalized full-field values, for exact / prefix / suffix specifiers.
    pub fields: HashMap<FieldId, String>,
    /// Normalized categories, kept separate so `Is` can match any one of them.
    pub categories: Vec<String>,
    /// term → field → count. Rebuilt on snapshot load, never serialized.
    #[serde(skip)]
    pub term_counts: HashMap<String, FieldCounts>,
}

impl IndexEntry {
    /// Project an entity into its indexed form.
    pub fn from_entity(entity: &Entity) -> Self {
        let mut fields = HashMap::new();
        fields.insert(FieldId::Title, normalize(&entity.title));
        fields.insert(FieldId::Content, normalize(&entity.content));
        fields.insert(FieldId::Author, normalize(&entity.author));
        fields.insert(FieldId::Link, normalize(&entity.link));

        let categories: Vec<String> = entity.categories.iter().map(|c| normalize(c)).collect();

        let mut entry = IndexEntry {
            state: entity.state,
            location: entity.location.clone(),
            fields,
            categories,
            term_counts: HashMap::new(),
        };
        entry.rebuild_terms();
        entry
    }

    /// Recompute the term table from the stored normalized fields.
    pub fn rebuild_terms(&mut self) {
        let mut counts: HashMap<String, FieldCounts> = HashMap::new();
        for (&field, value) in &self.fields {
            for term in tokenize(value) {
                *counts.entry(term).or_default().entry(field).or_insert(0) += 1;
            }
        }
        for category in &self.categories {
            for term in tokenize(category) {
                *counts
                    .entry(term)
                    .or_default()
                    .entry(FieldId::Category)
                    .or_insert(0) += 1;
            }
        }
        self.term_counts = counts;
    }

    /// Normalized value of a text field. Categories are joined for the rare
    /// caller that wants them as one string.
    pub fn field_value(&self, field: FieldId) -> Option<String> {
        match field {
            FieldId::Category => Some(self.categories.join(" ")),
            _ => self.fields.get(&field).cloned(),
        }
    }
}
