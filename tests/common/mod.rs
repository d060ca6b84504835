//! Shared test utilities and fixtures.

#![allow(dead_code)]

use std::sync::Arc;

use lutra::{
    EntityResolver, FieldId, InMemoryStore, MatchMode, Query, SearchCondition, SearchIndex,
    Specifier,
};
use tempfile::TempDir;

// Re-export canonical test utilities from lutra::testing
pub use lutra::testing::{bulk_store, make_entity, seeded_store};

/// A started index over a temp directory, plus the store behind it.
pub struct Fixture {
    /// Keeps the index directory alive for the test's duration.
    pub dir: TempDir,
    pub store: Arc<InMemoryStore>,
    pub index: Arc<SearchIndex>,
}

/// Start an index over the given store and feed it every visible entity, the
/// way the persistence layer's change notifications would.
pub fn indexed(store: Arc<InMemoryStore>) -> Fixture {
    let dir = TempDir::new().expect("temp index dir");
    let index = SearchIndex::new(dir.path(), store.clone() as Arc<dyn EntityResolver>);
    index.startup().expect("startup");
    for id in store.entity_ids() {
        let entity = store.resolve(id).unwrap();
        index.index(&entity).expect("index entity");
    }
    Fixture { dir, store, index }
}

/// The seeded seven-entity corpus, indexed.
pub fn seeded_index() -> Fixture {
    indexed(seeded_store())
}

pub fn title_contains(text: &str) -> SearchCondition {
    SearchCondition::text(FieldId::Title, Specifier::Contains, text)
}

pub fn content_contains(text: &str) -> SearchCondition {
    SearchCondition::text(FieldId::Content, Specifier::Contains, text)
}

/// Build a query, panicking on validation problems; tests that care about
/// warnings call `Query::build` directly.
pub fn query(conditions: Vec<SearchCondition>, mode: MatchMode) -> Query {
    Query::build(conditions, mode).expect("valid query").0
}

/// Entity ids of a hit list, sorted for comparisons.
pub fn hit_ids(hits: &[lutra::Hit]) -> Vec<u64> {
    let mut ids: Vec<u64> = hits.iter().map(|h| h.entity_id.get()).collect();
    ids.sort_unstable();
    ids
}
