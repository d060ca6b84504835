// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The search index: persistent, queryable, incrementally maintained.
//!
//! Structure is a classic inverted index split across two sharded maps:
//! entries (entity → indexed record) and postings (term → entity → per-field
//! counts). Sharding is what buys the concurrency contract: readers never
//! wait behind writers of unrelated entities, and writers for different
//! entities proceed in parallel. Calls for the *same* entity are serialized
//! by the persistence layer, which owns entity mutation sequencing — the
//! index does not re-serialize them.
//!
//! Lifecycle: [`SearchIndex::startup`] opens storage, recovers from unclean
//! shutdown, and honors deferred-maintenance flags; [`SearchIndex::shutdown`]
//! persists a checksummed snapshot. In between, the persistence layer's
//! change notifications drive [`SearchIndex::index`] / [`SearchIndex::remove`],
//! and subscribers watch it all through the event bus.
//!
//! # Invariants
//!
//! 1. **ONE_ENTRY_PER_VISIBLE_ENTITY**: every visible, indexable entity has
//!    exactly one entry. Bulk deletes that bypass change notifications break
//!    this; `clean_up` restores it.
//! 2. **ENTRY_POSTING_AGREEMENT**: see `postings.rs`. All mutation goes
//!    through `insert_entry_internal` / `remove_entry_internal`, which apply
//!    entry and postings as a pair — one entity's failed update can never
//!    corrupt another entity's state.

pub mod events;
mod maintenance;
pub(crate) mod postings;
mod snapshot;
pub mod tokenizer;

pub use events::{IndexEvent, MaintenanceKind, Subscription};
pub use maintenance::{MaintenanceHandle, MaintenanceOutcome};

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::progress::{CancelToken, NoProgress};
use crate::store::EntityResolver;
use crate::types::{Entity, EntityId, IndexStats};

use events::EventBus;
use postings::{FieldCounts, IndexEntry, PostingList};
use snapshot::{IndexStorage, PendingFlags};

/// The entity search index. Shared across threads behind an `Arc`.
pub struct SearchIndex {
    storage: IndexStorage,
    resolver: Arc<dyn EntityResolver>,
    open: AtomicBool,
    /// Serializes startup/shutdown so repeated calls cannot double-apply.
    lifecycle: Mutex<()>,
    entries: DashMap<EntityId, IndexEntry>,
    postings: DashMap<String, PostingList>,
    /// In-memory mirror of the persisted pending flags.
    flags: Mutex<PendingFlags>,
    /// Reindex and cleanup are mutually exclusive; this is the token.
    maintenance_active: AtomicBool,
    integrity_signals: AtomicU64,
    events: EventBus,
}

impl SearchIndex {
    /// Create an index over `dir`, resolving entities through `resolver`.
    /// No storage is touched until [`SearchIndex::startup`].
    pub fn new(dir: impl AsRef<Path>, resolver: Arc<dyn EntityResolver>) -> Arc<Self> {
        Arc::new(SearchIndex {
            storage: IndexStorage::new(dir.as_ref()),
            resolver,
            open: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            entries: DashMap::new(),
            postings: DashMap::new(),
            flags: Mutex::new(PendingFlags::default()),
            maintenance_active: AtomicBool::new(false),
            integrity_signals: AtomicU64::new(0),
            events: EventBus::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Open index storage. Idempotent: a second call on an open index is a
    /// no-op with no duplicate side effects.
    ///
    /// Recovery rules, in order:
    /// - a dirty marker from an unclean previous shutdown schedules a cleanup
    /// - a corrupt snapshot is discarded and schedules a full reindex
    /// - pending flags persisted by an earlier session are honored inline
    ///   before this call returns, and cleared on completion
    pub fn startup(self: &Arc<Self>) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.open.load(Ordering::Acquire) {
            return Ok(());
        }

        self.storage.ensure_dir()?;
        let mut flags = match self.storage.load_flags() {
            Ok(flags) => flags,
            Err(Error::Corrupt(reason)) => {
                warn!(%reason, "pending flags unreadable, assuming none");
                PendingFlags::default()
            }
            Err(e) => return Err(e),
        };

        if self.storage.is_dirty() {
            warn!("previous session did not shut down cleanly, scheduling cleanup");
            flags.cleanup = true;
        }

        match self.storage.load_snapshot() {
            Ok(persisted) => {
                for (id, entry) in persisted {
                    self.insert_entry_internal(id, entry);
                }
            }
            Err(Error::Corrupt(reason)) => {
                warn!(%reason, "snapshot rejected, scheduling full reindex");
                self.entries.clear();
                self.postings.clear();
                flags.reindex = true;
            }
            Err(e) => return Err(e),
        }

        self.storage.write_dirty_marker()?;
        *self.flags.lock() = flags;
        self.open.store(true, Ordering::Release);
        info!(entries = self.entries.len(), "search index started");

        // Deferred maintenance runs before startup reports ready. A full
        // reindex subsumes a cleanup, so the cleanup flag is retired with it.
        if flags.reindex {
            self.reindex_sync(&NoProgress, &CancelToken::new())?;
            if flags.cleanup {
                self.set_flags(|f| f.cleanup = false)?;
            }
        } else if flags.cleanup {
            self.cleanup_sync(&NoProgress, &CancelToken::new())?;
        }

        Ok(())
    }

    /// Release the index.
    ///
    /// `emergency = true` is the abnormal-termination path: it only marks the
    /// index closed and deliberately performs no I/O that could block or
    /// fail, leaving the dirty marker in place so the next startup schedules
    /// a cleanup. A normal shutdown persists the snapshot and flags first; if
    /// that write fails (say, [`Error::DiskExhausted`]) the index stays open
    /// so the caller can retry or fall back to an emergency shutdown.
    pub fn shutdown(&self, emergency: bool) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        if !self.open.load(Ordering::Acquire) {
            return Ok(());
        }

        if emergency {
            self.open.store(false, Ordering::Release);
            return Ok(());
        }

        self.storage.store_snapshot(self.collect_entries())?;
        self.storage.store_flags(*self.flags.lock())?;
        self.storage.clear_dirty_marker();
        self.open.store(false, Ordering::Release);
        info!("search index shut down");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::IndexUnavailable)
        }
    }

    // -------------------------------------------------------------------------
    // Incremental maintenance
    // -------------------------------------------------------------------------

    /// Index one entity, replacing any previous entry for it.
    ///
    /// An entity that has become invisible (hidden, soft-deleted) is removed
    /// instead: only the visible set is represented.
    pub fn index(&self, entity: &Entity) -> Result<()> {
        self.ensure_open()?;
        if !entity.state.is_visible() {
            return self.remove(entity.id);
        }
        self.insert_entry_internal(entity.id, IndexEntry::from_entity(entity));
        self.events
            .emit(IndexEvent::EntitiesIndexed(vec![entity.id]));
        Ok(())
    }

    /// Drop one entity from the index. Unknown ids are a no-op.
    pub fn remove(&self, id: EntityId) -> Result<()> {
        self.ensure_open()?;
        if self.remove_entry_internal(id) {
            self.events.emit(IndexEvent::EntitiesRemoved(vec![id]));
        }
        Ok(())
    }

    /// Compact storage: drop empty posting lists and rewrite the snapshot.
    ///
    /// Interruption-safe — the snapshot is written to a temp file and renamed
    /// into place, so a crash mid-optimize leaves the previous snapshot.
    pub fn optimize(&self) -> Result<()> {
        self.ensure_open()?;
        self.postings.retain(|_, list| !list.is_empty());
        self.storage.store_snapshot(self.collect_entries())
    }

    // -------------------------------------------------------------------------
    // Deferred maintenance flags
    // -------------------------------------------------------------------------

    /// Persist the "reindex pending" flag for the next startup to consume.
    /// No effect on the current session.
    pub fn reindex_on_next_startup(&self) -> Result<()> {
        self.ensure_open()?;
        self.set_flags(|f| f.reindex = true)
    }

    /// Persist the "cleanup pending" flag for the next startup to consume.
    /// No effect on the current session.
    pub fn clean_up_on_next_startup(&self) -> Result<()> {
        self.ensure_open()?;
        self.set_flags(|f| f.cleanup = true)
    }

    fn set_flags(&self, apply: impl FnOnce(&mut PendingFlags)) -> Result<()> {
        let mut flags = self.flags.lock();
        apply(&mut flags);
        self.storage.store_flags(*flags)
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Register an index listener. Dropping the subscription unregisters it,
    /// tying the listener's lifetime to the consumer's own scope.
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            entry_count: self.entries.len(),
            term_count: self.postings.iter().filter(|p| !p.is_empty()).count(),
            integrity_signals: self.integrity_signals.load(Ordering::Relaxed),
        }
    }

    /// Whether an entity currently has an index entry.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Count a reference that failed to resolve to a visible entity.
    ///
    /// Never aborts anything; a climbing count is the recommendation to run
    /// a cleanup pass.
    pub(crate) fn record_integrity_signal(&self, id: EntityId) {
        self.integrity_signals.fetch_add(1, Ordering::Relaxed);
        warn!(entity = %id, "hit no longer resolves to a visible entity");
    }

    // -------------------------------------------------------------------------
    // Internals shared with maintenance and the query executor
    // -------------------------------------------------------------------------

    pub(crate) fn resolver(&self) -> &Arc<dyn EntityResolver> {
        &self.resolver
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current (reindex-pending, cleanup-pending) flag state.
    pub fn pending_flags(&self) -> (bool, bool) {
        let flags = self.flags.lock();
        (flags.reindex, flags.cleanup)
    }

    /// Every indexed entity id. The snapshot is taken shard by shard; entries
    /// added or removed concurrently may or may not appear, which is the
    /// documented read-view semantics of a live index.
    pub(crate) fn universe(&self) -> Vec<EntityId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    /// Entities containing `term`, with per-field counts.
    pub(crate) fn term_entities(&self, term: &str) -> std::collections::HashMap<EntityId, FieldCounts> {
        self.postings
            .get(term)
            .map(|list| list.by_entity.clone())
            .unwrap_or_default()
    }

    /// Run `f` against an entity's entry without cloning it.
    pub(crate) fn with_entry<R>(&self, id: EntityId, f: impl FnOnce(&IndexEntry) -> R) -> Option<R> {
        self.entries.get(&id).map(|entry| f(entry.value()))
    }

    pub(crate) fn insert_entry_internal(&self, id: EntityId, entry: IndexEntry) {
        self.remove_entry_internal(id);
        for (term, counts) in &entry.term_counts {
            self.postings
                .entry(term.clone())
                .or_default()
                .by_entity
                .insert(id, counts.clone());
        }
        self.entries.insert(id, entry);
    }

    pub(crate) fn remove_entry_internal(&self, id: EntityId) -> bool {
        let Some((_, entry)) = self.entries.remove(&id) else {
            return false;
        };
        for term in entry.term_counts.keys() {
            if let Some(mut list) = self.postings.get_mut(term) {
                list.by_entity.remove(&id);
            }
        }
        true
    }

    pub(crate) fn clear_all(&self) {
        self.entries.clear();
        self.postings.clear();
    }

    fn collect_entries(&self) -> Vec<(EntityId, IndexEntry)> {
        self.entries
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }
}
