// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Collaborator seams toward the persistence layer.
//!
//! The core consumes persisted entities by reference and hands mutated ones
//! back in bulk; it never loads, saves, or transacts on its own. These two
//! traits are the whole contract:
//!
//! - [`EntityResolver`] — resolve an id to the current entity, or "absent" if
//!   it has been deleted since the reference was taken. Also enumerates ids
//!   for full rebuilds. The core treats resolution as a pure function it
//!   cannot mutate.
//! - [`EntityGateway`] — the write side: one bulk save per batch run.
//!
//! [`InMemoryStore`] implements both for the CLI and the test suites. A real
//! application binds its database layer here instead.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::types::{Entity, EntityId};

/// Read-side collaborator: id → current entity, or absent.
pub trait EntityResolver: Send + Sync {
    /// Resolve a reference to the current entity. `None` means the entity no
    /// longer exists; callers decide whether that is an error or a skip.
    fn resolve(&self, id: EntityId) -> Option<Entity>;

    /// Every entity id the persistence layer currently knows, in stable
    /// order. Drives full rebuilds; visibility filtering happens at the
    /// index, not here.
    fn entity_ids(&self) -> Vec<EntityId>;
}

/// Write-side collaborator: one bulk save per batch run.
pub trait EntityGateway: Send + Sync {
    /// Persist every entity in one bulk operation. The batch executor calls
    /// this exactly once per run, never per chunk.
    fn save_all(&self, entities: Vec<Entity>) -> crate::error::Result<()>;
}

/// In-memory entity store used by the CLI and the test suites.
///
/// A `BTreeMap` keeps enumeration order stable so rebuilds are deterministic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entities: RwLock<BTreeMap<EntityId, Entity>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    pub fn put(&self, entity: Entity) {
        self.entities.write().insert(entity.id, entity);
    }

    /// Remove an entity outright, as a bulk delete that bypasses change
    /// notifications would.
    pub fn evict(&self, id: EntityId) -> Option<Entity> {
        self.entities.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().get(&id).cloned()
    }
}

impl EntityResolver for InMemoryStore {
    fn resolve(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().get(&id).cloned()
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.entities.read().keys().copied().collect()
    }
}

impl EntityGateway for InMemoryStore {
    fn save_all(&self, entities: Vec<Entity>) -> crate::error::Result<()> {
        let mut map = self.entities.write();
        for entity in entities {
            map.insert(entity.id, entity);
        }
        Ok(())
    }
}
