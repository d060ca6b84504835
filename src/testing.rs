// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Canonical test fixtures, shared by unit tests, integration tests, and
//! benches so every suite talks about the same little corpus.

use std::sync::Arc;

use crate::store::InMemoryStore;
use crate::types::{ContainerId, Entity, EntityId, EntityState};

/// Build an entity with sensible defaults; override what the test cares
/// about.
pub fn make_entity(id: u64, title: &str, content: &str) -> Entity {
    Entity {
        id: EntityId(id),
        title: title.to_owned(),
        content: content.to_owned(),
        author: String::new(),
        link: String::new(),
        categories: Vec::new(),
        state: EntityState::Unread,
        location: vec![ContainerId(1)],
    }
}

/// A store pre-loaded with a small mixed corpus:
///
/// - ids 1..=3 under container 1 (feed A), release-themed titles
/// - ids 4..=5 under container 2 inside container 1 (nested feed)
/// - id 6 hidden, id 7 deleted — the invisible tail
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());

    let mut e1 = make_entity(1, "Stable Release Announced", "the release ships today");
    e1.author = "Core Team".into();
    e1.categories = vec!["releases".into()];
    store.put(e1);

    let mut e2 = make_entity(2, "Nightly Build Notes", "unstable build of the release branch");
    e2.state = EntityState::New;
    store.put(e2);

    let mut e3 = make_entity(3, "Security Advisory", "critical patch available");
    e3.state = EntityState::Read;
    store.put(e3);

    let mut e4 = make_entity(4, "Release Retrospective", "what went well");
    e4.location = vec![ContainerId(2), ContainerId(1)];
    store.put(e4);

    let mut e5 = make_entity(5, "Roadmap Update", "plans for the next release");
    e5.location = vec![ContainerId(2), ContainerId(1)];
    store.put(e5);

    let mut e6 = make_entity(6, "Hidden Draft", "not ready");
    e6.state = EntityState::Hidden;
    store.put(e6);

    let mut e7 = make_entity(7, "Removed Item", "soft deleted");
    e7.state = EntityState::Deleted;
    store.put(e7);

    store
}

/// A large uniform corpus for chunking and progress tests.
pub fn bulk_store(count: u64) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for id in 1..=count {
        store.put(make_entity(id, &format!("release item {id}"), "body text"));
    }
    store
}
