// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The one error type every index and query operation surfaces.
//!
//! Callers match on two variants and treat the rest as "something broke":
//! `IndexUnavailable` means retry after `startup()`, `DiskExhausted` means
//! stop retrying entirely until the user frees space. Everything else is a
//! storage or consistency fault that gets logged and shown.
//!
//! Cancellation is deliberately NOT here. A canceled maintenance pass or
//! batch run is a normal outcome (`MaintenanceOutcome::Canceled`,
//! `BatchOutcome::Canceled`), not a failure, because callers react
//! differently: canceled → silently stop, failed → surface a message.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the search index and everything layered on it.
#[derive(Debug, Error)]
pub enum Error {
    /// The index storage is not open. Recoverable by calling `startup()`.
    #[error("search index is not available; call startup() first")]
    IndexUnavailable,

    /// A storage write failed because the device is full.
    ///
    /// Distinct from [`Error::Storage`] because the remedy differs: automatic
    /// retry is pointless until space is freed, so callers stop immediately
    /// and surface the condition instead of backing off and retrying.
    #[error("index storage write failed: disk exhausted")]
    DiskExhausted,

    /// A reindex or cleanup pass is already running.
    ///
    /// The two maintenance operations are mutually exclusive; a second
    /// request is rejected rather than interleaved.
    #[error("a maintenance pass is already running")]
    MaintenanceBusy,

    /// An I/O fault in index storage that is not a disk-full condition.
    #[error("index storage failure: {0}")]
    Storage(io::Error),

    /// The persisted snapshot failed integrity or format validation.
    #[error("index snapshot is corrupt: {0}")]
    Corrupt(String),
}

impl Error {
    /// Classify an I/O error from a storage write.
    ///
    /// `ENOSPC` becomes [`Error::DiskExhausted`]; anything else is a generic
    /// [`Error::Storage`] fault.
    pub fn storage(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::StorageFull || err.raw_os_error() == Some(28) {
            Error::DiskExhausted
        } else {
            Error::Storage(err)
        }
    }
}
