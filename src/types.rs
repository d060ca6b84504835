// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The building blocks: entities, hits, and the ids that tie them together.
//!
//! The core never owns entity storage. It sees entities by value when the
//! persistence layer hands them over (change notifications, resolver lookups)
//! and refers to them by [`EntityId`] everywhere else. A [`Hit`] is therefore
//! deliberately small: an id, a score, and the one cached field (state) that
//! lets callers filter without resolving the full entity.
//!
//! # Invariants
//!
//! - `Hit::raw_score >= 0` — scores are accumulated term weights, never
//!   negative. Bucketing in `scoring` depends on this.
//! - An entity's `location` chain is ordered nearest-parent-first. Scope
//!   evaluation reads `location[0]` for non-recursive matches and the whole
//!   chain for recursive ones.

use serde::{Deserialize, Serialize};

// =============================================================================
// NEWTYPES: Type-safe identifiers
// =============================================================================

/// Opaque identifier of a persisted entity.
///
/// The core never interprets the value; it round-trips through the resolver
/// and the gateway. Prevents accidentally passing a container id where an
/// entity id is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Get the underlying value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a container (folder) in the hierarchy entities live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ContainerId(pub u64);

impl From<u64> for ContainerId {
    fn from(id: u64) -> Self {
        ContainerId(id)
    }
}

// =============================================================================
// FIELDS
// =============================================================================

/// The entity fields the index knows about and conditions can target.
///
/// `State` and `Location` are not text fields: they evaluate against the
/// cached entry state and container chain rather than posting lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldId {
    Title,
    Content,
    Author,
    Category,
    Link,
    State,
    Location,
}

impl FieldId {
    /// Text fields carried into posting lists and exact-value caches.
    pub const TEXT: [FieldId; 5] = [
        FieldId::Title,
        FieldId::Content,
        FieldId::Author,
        FieldId::Category,
        FieldId::Link,
    ];

    /// Whether this field is backed by indexed text.
    #[inline]
    pub fn is_text(self) -> bool {
        !matches!(self, FieldId::State | FieldId::Location)
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Lifecycle state of an entity.
///
/// The visible set is everything except `Hidden` and `Deleted`; only visible
/// entities are indexed and returned from searches by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityState {
    New,
    Unread,
    Updated,
    Read,
    Hidden,
    Deleted,
}

impl EntityState {
    /// Whether this state is in the visible set.
    #[inline]
    pub fn is_visible(self) -> bool {
        !matches!(self, EntityState::Hidden | EntityState::Deleted)
    }

    /// All states, for enum-set conditions and test strategies.
    pub const ALL: [EntityState; 6] = [
        EntityState::New,
        EntityState::Unread,
        EntityState::Updated,
        EntityState::Read,
        EntityState::Hidden,
        EntityState::Deleted,
    ];
}

/// A persisted entity as the core sees it.
///
/// This is the indexable projection the persistence layer exposes, not the
/// storage schema. `location` is the ancestor container chain, nearest parent
/// first, so scope conditions never need to walk an external tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub state: EntityState,
    #[serde(default)]
    pub location: Vec<ContainerId>,
}

impl Entity {
    /// Direct parent container, if the entity is filed anywhere.
    #[inline]
    pub fn parent(&self) -> Option<ContainerId> {
        self.location.first().copied()
    }

    /// Whether `container` appears anywhere in the ancestor chain.
    #[inline]
    pub fn is_under(&self, container: ContainerId) -> bool {
        self.location.contains(&container)
    }
}

// =============================================================================
// HITS
// =============================================================================

/// One query match: an entity reference plus relevance, not the entity itself.
///
/// Produced by a single query execution and never mutated. The cached state
/// lets callers do fast visibility filtering without a resolver round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub entity_id: EntityId,
    pub raw_score: f32,
    pub cached_state: EntityState,
}

impl Hit {
    pub fn new(entity_id: EntityId, raw_score: f32, cached_state: EntityState) -> Self {
        debug_assert!(raw_score >= 0.0, "hit scores are never negative");
        Hit {
            entity_id,
            raw_score,
            cached_state,
        }
    }
}

// =============================================================================
// STATS
// =============================================================================

/// Counters reported by the index for inspection and diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of indexed entities.
    pub entry_count: usize,
    /// Number of distinct terms across all posting lists.
    pub term_count: usize,
    /// Integrity signals recorded since startup. A climbing count is the
    /// standing recommendation to schedule a cleanup pass.
    pub integrity_signals: u64,
}
