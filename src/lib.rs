//! Search and filter core for feed-reader entities.
//!
//! This crate is the systems half of a desktop feed reader: a full-text
//! index over persisted entities, a condition-based query model, relevance
//! bucketing, and a rule engine that applies ordered, conflict-checked
//! actions over matching result sets in bounded batches. The windowed UI,
//! the persistence store, and feed fetching all live elsewhere and talk to
//! this core through a handful of traits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   query      │────▶│    index     │◀────│    store     │
//! │ (conditions, │     │ (postings,   │     │ (resolver /  │
//! │  executor)   │     │  lifecycle)  │     │  gateway)    │
//! └──────┬───────┘     └──────┬───────┘     └──────┬───────┘
//!        │                    │                    │
//!        ▼                    ▼                    ▼
//! ┌──────────────┐     ┌──────────────────────────────────┐
//! │   scoring    │     │              rules               │
//! │ (buckets)    │     │ (store, conflicts, batch runner) │
//! └──────────────┘     └──────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use lutra::{
//!     index::SearchIndex,
//!     query::{MatchMode, Query, QueryExecutor, SearchCondition, Specifier},
//!     store::InMemoryStore,
//!     types::FieldId,
//! };
//!
//! let store = Arc::new(InMemoryStore::new());
//! let index = SearchIndex::new("/tmp/index", store.clone());
//! index.startup()?;
//!
//! let (query, _warnings) = Query::build(
//!     vec![SearchCondition::text(FieldId::Title, Specifier::Contains, "release")],
//!     MatchMode::All,
//! )?;
//! let hits = QueryExecutor::new(index.clone()).execute(&query)?;
//! ```

pub mod error;
pub mod index;
pub mod progress;
pub mod query;
pub mod rules;
pub mod scoring;
pub mod store;
pub mod testing;
pub mod types;

// Re-exports for the common path.
pub use error::{Error, Result};
pub use index::{IndexEvent, MaintenanceKind, MaintenanceOutcome, SearchIndex, Subscription};
pub use progress::{CancelToken, NoProgress, Progress};
pub use query::{MatchMode, Query, QueryExecutor, QueryWarning, SearchCondition, Specifier};
pub use rules::{
    Action, ActionConflict, ActionRegistry, BatchOutcome, BatchRuleExecutor, FilterStore, Rule,
};
pub use scoring::{LowScoreFilter, RelevanceBucket, RelevanceTiers};
pub use store::{EntityGateway, EntityResolver, InMemoryStore};
pub use types::{ContainerId, Entity, EntityId, EntityState, FieldId, Hit, IndexStats};
