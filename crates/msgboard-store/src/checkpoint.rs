//! Checkpoint: fold the WAL into a snapshot and reclaim old segments
//!
//! Sequence, with the WAL already rotated to a fresh segment `n`:
//! 1. Stream the ordered image to `snapshot-n.snap.tmp`
//! 2. durable_sync, rename to `snapshot-n.snap`, sync the directory
//! 3. Delete WAL segments `< n` and snapshots `< n`
//!
//! Crash before step 2 completes: the old snapshot plus every WAL segment is
//! still on disk, recovery ignores the `.tmp`. Crash during step 3: recovery
//! picks the newest snapshot and replays only segments `>= n`.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{StoreError, StoreResult};
use crate::platform_durability::sync_directory;
use crate::snapshot::{list_snapshots, SnapshotWriter};
use crate::wal::list_segments;

/// Outcome of a checkpoint.
#[derive(Debug, Clone)]
pub struct CheckpointStats {
    /// Snapshot written by this checkpoint
    pub snapshot_path: PathBuf,
    /// First WAL segment not covered by the snapshot
    pub sequence: u64,
    /// Entries in the snapshot
    pub entries: usize,
    /// Snapshot size in bytes
    pub snapshot_bytes: u64,
    /// WAL segments deleted
    pub wal_segments_removed: usize,
    /// Older snapshots deleted
    pub snapshots_removed: usize,
}

/// Write the snapshot for `sequence` from an ordered iterator of entries,
/// then prune everything it supersedes.
pub fn write_checkpoint<'a, I>(
    data_dir: &Path,
    wal_dir: &Path,
    sequence: u64,
    entries: I,
) -> StoreResult<CheckpointStats>
where
    I: IntoIterator<Item = (&'a [u8], &'a [u8])>,
{
    let mut writer = SnapshotWriter::create(data_dir, sequence)?;
    for (key, value) in entries {
        writer.write_entry(key, value)?;
    }
    let snapshot = writer.finish()?;

    let (wal_segments_removed, snapshots_removed) = prune_before(data_dir, wal_dir, sequence)?;

    let stats = CheckpointStats {
        snapshot_path: snapshot.path,
        sequence,
        entries: snapshot.entries,
        snapshot_bytes: snapshot.bytes,
        wal_segments_removed,
        snapshots_removed,
    };

    info!(
        snapshot = %stats.snapshot_path.display(),
        entries = stats.entries,
        bytes = stats.snapshot_bytes,
        wal_removed = stats.wal_segments_removed,
        "checkpoint complete"
    );
    Ok(stats)
}

/// Delete WAL segments and snapshots older than `sequence`.
///
/// Only call this once `snapshot-<sequence>.snap` is durable.
pub fn prune_before(data_dir: &Path, wal_dir: &Path, sequence: u64) -> StoreResult<(usize, usize)> {
    let remove = |path: &Path| -> StoreResult<()> {
        std::fs::remove_file(path)
            .map_err(|e| StoreError::io_at(path, &e, "Failed to remove superseded file"))
    };

    let mut wal_removed = 0;
    for (seq, path) in list_segments(wal_dir)? {
        if seq < sequence {
            remove(&path)?;
            wal_removed += 1;
        }
    }

    let mut snapshots_removed = 0;
    for (seq, path) in list_snapshots(data_dir)? {
        if seq < sequence {
            remove(&path)?;
            snapshots_removed += 1;
        }
    }

    // Unlinks that don't survive a crash are harmless; recovery ignores them
    for dir in [wal_dir, data_dir] {
        if let Err(e) = sync_directory(dir) {
            warn!(dir = %dir.display(), error = %e, "directory sync after prune failed");
        }
    }

    Ok((wal_removed, snapshots_removed))
}
