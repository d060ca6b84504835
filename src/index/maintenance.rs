// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The two bulk maintenance passes: full reindex and consistency cleanup.
//!
//! Both are long-running, cancelable, and mutually exclusive. They differ in
//! shape:
//!
//! - **Reindex** is clear-then-rebuild: wipe everything, then re-add every
//!   eligible entity one at a time. Canceling leaves a partially-rebuilt but
//!   fully usable index, with the reindex-pending flag persisted so the next
//!   startup finishes the job.
//! - **Cleanup** is a targeted sweep: for every entry, verify a visible
//!   entity still resolves; drop orphans. It never clears the index first.
//!
//! Cancellation is checked per entity / per entry, so a user-initiated cancel
//! completes quickly even on a large corpus. Both passes run on a dedicated
//! named thread, never on the caller's — [`SearchIndex::spawn_reindex_all`]
//! and [`SearchIndex::spawn_clean_up`] hand back a [`MaintenanceHandle`].

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::progress::{CancelToken, Progress};

use super::events::{IndexEvent, MaintenanceKind};
use super::postings::IndexEntry;
use super::SearchIndex;

/// How a maintenance pass ended. Canceled is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceOutcome {
    /// The pass visited everything. `processed` counts entities (reindex) or
    /// entries (cleanup).
    Completed { processed: u64 },
    /// The pass stopped at a cancellation point; the corresponding pending
    /// flag has been persisted for the next startup.
    Canceled { processed: u64 },
}

/// A maintenance pass running on its background thread.
pub struct MaintenanceHandle {
    kind: MaintenanceKind,
    token: CancelToken,
    join: JoinHandle<Result<MaintenanceOutcome>>,
}

impl MaintenanceHandle {
    pub fn kind(&self) -> MaintenanceKind {
        self.kind
    }

    /// Request cancellation; the pass notices at its next check point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the pass to finish and collect its outcome.
    pub fn join(self) -> Result<MaintenanceOutcome> {
        self.join
            .join()
            .map_err(|_| Error::Storage(io::Error::other("maintenance thread panicked")))?
    }
}

/// Holds the exclusivity token; released on drop even if the pass panics.
struct MaintenanceGuard {
    index: Arc<SearchIndex>,
}

impl Drop for MaintenanceGuard {
    fn drop(&mut self) {
        self.index.maintenance_active.store(false, Ordering::Release);
    }
}

impl SearchIndex {
    fn try_begin_maintenance(self: &Arc<Self>) -> Result<MaintenanceGuard> {
        if self
            .maintenance_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::MaintenanceBusy);
        }
        Ok(MaintenanceGuard {
            index: Arc::clone(self),
        })
    }

    /// Start a full rebuild on a background thread.
    ///
    /// Rejected with [`Error::MaintenanceBusy`] if a reindex or cleanup is
    /// already running — concurrent requests are never interleaved.
    pub fn spawn_reindex_all(
        self: &Arc<Self>,
        progress: Arc<dyn Progress>,
        token: CancelToken,
    ) -> Result<MaintenanceHandle> {
        self.ensure_open()?;
        let guard = self.try_begin_maintenance()?;
        let index = Arc::clone(self);
        let thread_token = token.clone();
        let join = thread::Builder::new()
            .name("lutra-reindex".into())
            .spawn(move || {
                let _guard = guard;
                index.reindex_locked(progress.as_ref(), &thread_token)
            })
            .map_err(Error::storage)?;
        Ok(MaintenanceHandle {
            kind: MaintenanceKind::Reindex,
            token,
            join,
        })
    }

    /// Start a consistency sweep on a background thread. Same exclusivity
    /// rules as [`SearchIndex::spawn_reindex_all`].
    pub fn spawn_clean_up(
        self: &Arc<Self>,
        progress: Arc<dyn Progress>,
        token: CancelToken,
    ) -> Result<MaintenanceHandle> {
        self.ensure_open()?;
        let guard = self.try_begin_maintenance()?;
        let index = Arc::clone(self);
        let thread_token = token.clone();
        let join = thread::Builder::new()
            .name("lutra-cleanup".into())
            .spawn(move || {
                let _guard = guard;
                index.cleanup_locked(progress.as_ref(), &thread_token)
            })
            .map_err(Error::storage)?;
        Ok(MaintenanceHandle {
            kind: MaintenanceKind::Cleanup,
            token,
            join,
        })
    }

    /// Synchronous reindex used by `startup()` to honor a pending flag.
    pub(crate) fn reindex_sync(
        self: &Arc<Self>,
        progress: &dyn Progress,
        token: &CancelToken,
    ) -> Result<MaintenanceOutcome> {
        self.ensure_open()?;
        let _guard = self.try_begin_maintenance()?;
        self.reindex_locked(progress, token)
    }

    /// Synchronous cleanup used by `startup()` to honor a pending flag.
    pub(crate) fn cleanup_sync(
        self: &Arc<Self>,
        progress: &dyn Progress,
        token: &CancelToken,
    ) -> Result<MaintenanceOutcome> {
        self.ensure_open()?;
        let _guard = self.try_begin_maintenance()?;
        self.cleanup_locked(progress, token)
    }

    /// The rebuild loop. Caller holds the maintenance token.
    fn reindex_locked(
        self: &Arc<Self>,
        progress: &dyn Progress,
        token: &CancelToken,
    ) -> Result<MaintenanceOutcome> {
        self.events()
            .emit(IndexEvent::MaintenanceStarted(MaintenanceKind::Reindex));
        progress.message("rebuilding search index");

        self.clear_all();
        let ids = self.resolver().entity_ids();
        progress.begin(ids.len() as u64);

        let mut processed = 0u64;
        for id in ids {
            if token.is_canceled() {
                self.set_flags(|f| f.reindex = true)?;
                self.finish_maintenance(progress, MaintenanceKind::Reindex);
                info!(processed, "reindex canceled, completion deferred to next startup");
                return Ok(MaintenanceOutcome::Canceled { processed });
            }
            if let Some(entity) = self.resolver().resolve(id) {
                if entity.state.is_visible() {
                    self.insert_entry_internal(id, IndexEntry::from_entity(&entity));
                }
            }
            processed += 1;
            progress.advance(1);
        }

        self.set_flags(|f| f.reindex = false)?;
        self.finish_maintenance(progress, MaintenanceKind::Reindex);
        info!(processed, "reindex complete");
        Ok(MaintenanceOutcome::Completed { processed })
    }

    /// The sweep loop. Caller holds the maintenance token.
    fn cleanup_locked(
        self: &Arc<Self>,
        progress: &dyn Progress,
        token: &CancelToken,
    ) -> Result<MaintenanceOutcome> {
        self.events()
            .emit(IndexEvent::MaintenanceStarted(MaintenanceKind::Cleanup));
        progress.message("sweeping orphaned index entries");

        let ids = self.universe();
        progress.begin(ids.len() as u64);

        let mut processed = 0u64;
        let mut removed = Vec::new();
        for id in ids {
            if token.is_canceled() {
                self.set_flags(|f| f.cleanup = true)?;
                if !removed.is_empty() {
                    self.events().emit(IndexEvent::EntitiesRemoved(removed));
                }
                self.finish_maintenance(progress, MaintenanceKind::Cleanup);
                info!(processed, "cleanup canceled, completion deferred to next startup");
                return Ok(MaintenanceOutcome::Canceled { processed });
            }
            let alive = self
                .resolver()
                .resolve(id)
                .is_some_and(|entity| entity.state.is_visible());
            if !alive && self.remove_entry_internal(id) {
                removed.push(id);
            }
            processed += 1;
            progress.advance(1);
        }

        debug!(orphans = removed.len(), "cleanup sweep finished");
        self.set_flags(|f| f.cleanup = false)?;
        if !removed.is_empty() {
            self.events().emit(IndexEvent::EntitiesRemoved(removed));
        }
        self.finish_maintenance(progress, MaintenanceKind::Cleanup);
        Ok(MaintenanceOutcome::Completed { processed })
    }

    fn finish_maintenance(&self, progress: &dyn Progress, kind: MaintenanceKind) {
        self.events().emit(IndexEvent::MaintenanceFinished(kind));
        progress.done();
    }
}
