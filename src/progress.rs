// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Progress reporting and cooperative cancellation.
//!
//! Long-running operations (reindex, cleanup, batch rule runs) take a
//! [`Progress`] sink and a [`CancelToken`]. The token is checked at a fine
//! granularity — per entity, per entry, per chunk — so a user-initiated
//! cancel lands in well under a second even on a large corpus. Cancellation
//! is an outcome, never an error; see `error.rs`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sink for progress updates from a background operation.
///
/// Implementations must tolerate being called from a thread other than the
/// one that started the operation. The CLI backs this with an indicatif bar;
/// tests back it with counters.
pub trait Progress: Send + Sync {
    /// The operation knows its total unit count.
    fn begin(&self, total: u64);

    /// One or more units of work finished.
    fn advance(&self, units: u64);

    /// Human-readable status line, replaced on each call.
    fn message(&self, text: &str);

    /// The operation finished (completed, canceled, or failed).
    fn done(&self);
}

/// A progress sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _total: u64) {}
    fn advance(&self, _units: u64) {}
    fn message(&self, _text: &str) {}
    fn done(&self) {}
}

/// Cooperative cancellation flag, cheap to clone and share across threads.
///
/// Cancel requests are one-way: once set, the token stays canceled for the
/// lifetime of the operation it was handed to. Each operation gets a fresh
/// token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Polled by the running operation between units of work.
    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
