//! Write-ahead log
//!
//! Write ordering for every mutation:
//! 1. Serialize the record (CRC32C included)
//! 2. Append it to the current segment
//! 3. `durable_sync()` when the store runs with `sync_writes`
//! 4. Return; only now may the caller touch the in-memory map
//!
//! Segments are named `wal-<seq:016x>.log` so lexicographic order is replay order.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::format::{deserialize_entry, serialize_entry, Operation, WalEntry, HEADER_SIZE, MAGIC_ARRAY};
use crate::platform_durability::durable_sync;

const WAL_PREFIX: &str = "wal-";
const WAL_SUFFIX: &str = ".log";

/// File name of WAL segment `sequence`.
pub fn segment_name(sequence: u64) -> String {
    format!("{}{:016x}{}", WAL_PREFIX, sequence, WAL_SUFFIX)
}

/// Parse `<prefix><16 hex digits><suffix>` back into a sequence number.
pub(crate) fn parse_sequence(name: &str, prefix: &str, suffix: &str) -> Option<u64> {
    let hex = name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if hex.len() != 16 {
        return None;
    }
    u64::from_str_radix(hex, 16).ok()
}

/// All WAL segments in `wal_dir`, sorted by sequence.
pub fn list_segments(wal_dir: &Path) -> StoreResult<Vec<(u64, PathBuf)>> {
    let dir_entries = std::fs::read_dir(wal_dir)
        .map_err(|e| StoreError::io_at(wal_dir, &e, "Failed to read WAL directory"))?;

    let mut segments = Vec::new();
    for entry in dir_entries {
        let entry = entry.map_err(|e| StoreError::io_at(wal_dir, &e, "Failed to read directory entry"))?;
        if let Some(seq) = entry.file_name().to_str().and_then(|n| parse_sequence(n, WAL_PREFIX, WAL_SUFFIX)) {
            segments.push((seq, entry.path()));
        }
    }
    segments.sort_by_key(|(seq, _)| *seq);
    Ok(segments)
}

/// Appends records to the current WAL segment.
///
/// INVARIANT: `append` must return Ok before the caller applies the
/// mutation in memory.
pub struct WalWriter {
    file: File,
    path: PathBuf,
    size: u64,
    wal_dir: PathBuf,
    sequence: u64,
    rotation_size: u64,
}

impl WalWriter {
    /// Open a writer on a fresh segment numbered at least `min_sequence`.
    ///
    /// If the newest existing segment is empty it is reused, otherwise the
    /// writer starts at the next sequence. Never appending to a replayed
    /// segment keeps new records clear of any torn tail left by a crash.
    pub fn open<P: AsRef<Path>>(wal_dir: P, rotation_size: u64, min_sequence: u64) -> StoreResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| StoreError::io_at(&wal_dir, &e, "Failed to create WAL directory"))?;

        let sequence = match list_segments(&wal_dir)?.last() {
            None => 0,
            Some((seq, path)) => {
                let len = std::fs::metadata(path)
                    .map_err(|e| StoreError::io_at(path, &e, "Failed to stat WAL segment"))?
                    .len();
                if len == 0 { *seq } else { seq + 1 }
            }
        }.max(min_sequence);

        let (file, path) = Self::open_segment(&wal_dir, sequence)?;
        debug!(segment = %path.display(), "WAL writer opened");

        Ok(Self { file, path, size: 0, wal_dir, sequence, rotation_size })
    }

    fn open_segment(wal_dir: &Path, sequence: u64) -> StoreResult<(File, PathBuf)> {
        let path = wal_dir.join(segment_name(sequence));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StoreError::io_at(&path, &e, "Failed to open WAL segment"))?;
        Ok((file, path))
    }

    /// Append one record. Returns the number of bytes written.
    ///
    /// With `sync` set, the record is on persistent media when this returns.
    /// Without it the record sits in the OS page cache until the next `sync()`.
    pub fn append(&mut self, key: &[u8], value: &[u8], op: Operation, sync: bool) -> StoreResult<u64> {
        let record = serialize_entry(key, value, op)?;
        let len = record.len() as u64;

        if self.size > 0 && self.size + len > self.rotation_size {
            self.rotate()?;
        }

        self.file.write_all(&record)
            .map_err(|e| StoreError::io_at(&self.path, &e, "WAL write failed"))?;

        if sync {
            durable_sync(&self.file)
                .map_err(|e| StoreError::io_at(&self.path, &e, "WAL durable_sync failed"))?;
        }

        self.size += len;
        Ok(len)
    }

    /// Sync the current segment and switch to a new, empty one.
    /// Returns the new segment's sequence number.
    pub fn rotate(&mut self) -> StoreResult<u64> {
        durable_sync(&self.file)
            .map_err(|e| StoreError::io_at(&self.path, &e, "WAL sync before rotation failed"))?;

        let next = self.sequence + 1;
        let (file, path) = Self::open_segment(&self.wal_dir, next)?;
        debug!(from = self.sequence, to = next, "WAL rotated");

        self.file = file;
        self.path = path;
        self.size = 0;
        self.sequence = next;
        Ok(next)
    }

    /// Sync the current segment without writing anything.
    pub fn sync(&self) -> StoreResult<()> {
        durable_sync(&self.file)
            .map_err(|e| StoreError::io_at(&self.path, &e, "WAL sync failed"))
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }
}

/// Replays WAL segments during recovery.
pub struct WalReader {
    wal_dir: PathBuf,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self { wal_dir: wal_dir.as_ref().to_path_buf() }
    }

    /// Every record in every segment, in write order.
    pub fn recover_entries(&self) -> StoreResult<Vec<WalEntry>> {
        self.recover_entries_from(0)
    }

    /// Records from segments with sequence >= `min_sequence`, in write order.
    ///
    /// Per segment:
    /// - bad magic or checksum: warn and resync at the next magic
    /// - record running past EOF with no later magic: torn write, stop here
    pub fn recover_entries_from(&self, min_sequence: u64) -> StoreResult<Vec<WalEntry>> {
        let mut all_entries = Vec::new();
        for (seq, path) in list_segments(&self.wal_dir)? {
            if seq < min_sequence {
                continue;
            }
            all_entries.extend(self.recover_from_file(&path)?);
        }
        Ok(all_entries)
    }

    fn recover_from_file(&self, path: &Path) -> StoreResult<Vec<WalEntry>> {
        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .map_err(|e| StoreError::io_at(path, &e, "Failed to read WAL segment"))?;

        let mut entries = Vec::new();
        let mut offset = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            if buffer[offset..offset + 4] != MAGIC_ARRAY {
                warn!(segment = %path.display(), offset, "bad magic in WAL, scanning for next record");
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => { offset = next; continue; }
                    None => break,
                }
            }

            let length = u32::from_le_bytes([
                buffer[offset + 4], buffer[offset + 5],
                buffer[offset + 6], buffer[offset + 7],
            ]) as usize;
            let total = HEADER_SIZE + length;

            if offset + total > buffer.len() {
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => {
                        warn!(segment = %path.display(), offset, "record overruns segment, resyncing");
                        offset = next;
                        continue;
                    }
                    None => {
                        warn!(segment = %path.display(), offset,
                              need = total, have = buffer.len() - offset,
                              "torn write at end of WAL segment");
                        break;
                    }
                }
            }

            match deserialize_entry(&buffer[offset..offset + total], path, offset as u64) {
                Ok(entry) => {
                    entries.push(entry);
                    offset += total;
                }
                Err(e) => {
                    warn!(error = %e, "corrupt WAL record skipped");
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => { offset = next; continue; }
                        None => break,
                    }
                }
            }
        }

        Ok(entries)
    }
}

/// Position of the next magic at or after `start`.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    if start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(MAGIC_ARRAY.len())
        .position(|w| w == MAGIC_ARRAY)
        .map(|p| start + p)
}
