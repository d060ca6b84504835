// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! On-disk state of the index: snapshot, pending flags, dirty marker.
//!
//! Three files under the index directory:
//!
//! - `snapshot.lutra` — the serialized entries, prefixed with a CRC32 line so
//!   a torn or bit-rotted write is detected at load instead of producing
//!   silently wrong search results.
//! - `pending.json` — the two maintenance flags ("reindex pending",
//!   "cleanup pending"), read once at startup and cleared when the
//!   corresponding pass completes.
//! - `dirty` — present while a session has the index open. Found at startup,
//!   it means the previous session did not shut down cleanly and a cleanup
//!   pass is due.
//!
//! All writes go through write-then-rename so an interrupted `optimize()` or
//! shutdown never leaves a half-written file where the good one was.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::EntityId;

use super::postings::IndexEntry;

const SNAPSHOT_FILE: &str = "snapshot.lutra";
const FLAGS_FILE: &str = "pending.json";
const DIRTY_FILE: &str = "dirty";

/// Deferred-maintenance flags persisted across restarts.
///
/// Setting either flag is a no-op for the current session; `startup()` is the
/// only consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PendingFlags {
    #[serde(default)]
    pub reindex: bool,
    #[serde(default)]
    pub cleanup: bool,
}

/// Serialized form of the index contents.
#[derive(Serialize, Deserialize, Default)]
struct SnapshotBody {
    entries: Vec<(EntityId, IndexEntry)>,
}

/// The index directory and the three files inside it.
#[derive(Debug, Clone)]
pub(crate) struct IndexStorage {
    dir: PathBuf,
}

impl IndexStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        IndexStorage { dir: dir.into() }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(Error::storage)
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    // -------------------------------------------------------------------------
    // Pending flags
    // -------------------------------------------------------------------------

    /// Load the flags; a missing file means nothing is pending.
    pub fn load_flags(&self) -> Result<PendingFlags> {
        match fs::read_to_string(self.path(FLAGS_FILE)) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| Error::Corrupt(format!("pending flags: {e}"))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(PendingFlags::default()),
            Err(e) => Err(Error::storage(e)),
        }
    }

    pub fn store_flags(&self, flags: PendingFlags) -> Result<()> {
        let body = serde_json::to_string(&flags)
            .map_err(|e| Error::Corrupt(format!("pending flags: {e}")))?;
        write_atomic(&self.path(FLAGS_FILE), body.as_bytes())
    }

    // -------------------------------------------------------------------------
    // Dirty marker
    // -------------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.path(DIRTY_FILE).exists()
    }

    pub fn write_dirty_marker(&self) -> Result<()> {
        fs::write(self.path(DIRTY_FILE), b"open").map_err(Error::storage)
    }

    /// Best effort by design: emergency shutdown must not fail on this.
    pub fn clear_dirty_marker(&self) {
        let _ = fs::remove_file(self.path(DIRTY_FILE));
    }

    // -------------------------------------------------------------------------
    // Snapshot
    // -------------------------------------------------------------------------

    /// Load the snapshot, verifying its checksum.
    ///
    /// Returns an empty entry set when no snapshot exists (first run).
    /// A checksum or format mismatch is `Error::Corrupt`; the caller decides
    /// whether that is fatal or just schedules a rebuild.
    pub fn load_snapshot(&self) -> Result<Vec<(EntityId, IndexEntry)>> {
        let raw = match fs::read_to_string(self.path(SNAPSHOT_FILE)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::storage(e)),
        };

        let (header, body) = raw
            .split_once('\n')
            .ok_or_else(|| Error::Corrupt("snapshot missing checksum header".into()))?;
        let expected = u32::from_str_radix(header.trim(), 16)
            .map_err(|_| Error::Corrupt("snapshot checksum header is not hex".into()))?;
        let actual = crc32fast::hash(body.as_bytes());
        if expected != actual {
            return Err(Error::Corrupt(format!(
                "snapshot checksum mismatch: stored {expected:08x}, computed {actual:08x}"
            )));
        }

        let snapshot: SnapshotBody =
            serde_json::from_str(body).map_err(|e| Error::Corrupt(format!("snapshot: {e}")))?;
        let mut entries = snapshot.entries;
        for (_, entry) in &mut entries {
            entry.rebuild_terms();
        }
        Ok(entries)
    }

    /// Write the snapshot with its checksum header, atomically.
    pub fn store_snapshot(&self, entries: Vec<(EntityId, IndexEntry)>) -> Result<()> {
        let body = serde_json::to_string(&SnapshotBody { entries })
            .map_err(|e| Error::Corrupt(format!("snapshot: {e}")))?;
        let checksum = crc32fast::hash(body.as_bytes());
        let payload = format!("{checksum:08x}\n{body}");
        write_atomic(&self.path(SNAPSHOT_FILE), payload.as_bytes())
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(Error::storage)?;
    fs::rename(&tmp, path).map_err(Error::storage)
}
