//! Snapshot files: the full ordered image of the store at a checkpoint
//!
//! A snapshot is written to `snapshot-<seq>.snap.tmp`, synced, then renamed
//! into place, so a file with the final name is always complete.
//! `<seq>` is the first WAL segment the snapshot does NOT cover.
//!
//! File format: repeated SnapshotRecordHeader (16 bytes) + key_bytes + value_bytes,
//! in strictly ascending key order.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::format::{MAGIC_ARRAY, MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::platform_durability::{durable_sync, sync_directory};
use crate::wal::parse_sequence;

const SNAPSHOT_PREFIX: &str = "snapshot-";
const SNAPSHOT_SUFFIX: &str = ".snap";
const TEMP_SUFFIX: &str = ".tmp";

/// Snapshot record header size in bytes
const RECORD_HEADER_SIZE: usize = 16;

/// Snapshot record header.
///
/// Layout:
///   [0..4]   magic:     [u8;4] - "MSGB"
///   [4..6]   key_len:   u16 LE
///   [6..10]  value_len: u32 LE
///   [10..14] checksum:  u32 LE - CRC32C of (key_bytes + value_bytes)
///   [14..16] reserved, zero
#[derive(Debug, Clone, Copy)]
struct SnapshotRecordHeader {
    magic: [u8; 4],
    key_len: u16,
    value_len: u32,
    checksum: u32,
}

impl SnapshotRecordHeader {
    fn new(key_len: u16, value_len: u32, checksum: u32) -> Self {
        Self { magic: MAGIC_ARRAY, key_len, value_len, checksum }
    }

    fn to_bytes(&self) -> [u8; RECORD_HEADER_SIZE] {
        let mut buf = [0u8; RECORD_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..6].copy_from_slice(&self.key_len.to_le_bytes());
        buf[6..10].copy_from_slice(&self.value_len.to_le_bytes());
        buf[10..14].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        Self {
            magic,
            key_len: u16::from_le_bytes([buf[4], buf[5]]),
            value_len: u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]),
            checksum: u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]),
        }
    }
}

fn record_checksum(key: &[u8], value: &[u8]) -> u32 {
    crc32c::crc32c_append(crc32c::crc32c(key), value)
}

/// File name of the snapshot that replays from WAL segment `sequence`.
pub fn snapshot_name(sequence: u64) -> String {
    format!("{}{:016x}{}", SNAPSHOT_PREFIX, sequence, SNAPSHOT_SUFFIX)
}

/// All completed snapshots in `data_dir`, sorted by sequence.
pub fn list_snapshots(data_dir: &Path) -> StoreResult<Vec<(u64, PathBuf)>> {
    let dir_entries = std::fs::read_dir(data_dir)
        .map_err(|e| StoreError::io_at(data_dir, &e, "Failed to read data directory"))?;

    let mut snapshots = Vec::new();
    for entry in dir_entries {
        let entry = entry.map_err(|e| StoreError::io_at(data_dir, &e, "Failed to read directory entry"))?;
        if let Some(seq) = entry.file_name().to_str()
            .and_then(|n| parse_sequence(n, SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX))
        {
            snapshots.push((seq, entry.path()));
        }
    }
    snapshots.sort_by_key(|(seq, _)| *seq);
    Ok(snapshots)
}

/// Delete half-written snapshots left by a crash mid-checkpoint.
/// Returns how many were removed.
pub fn remove_temp_files(data_dir: &Path) -> StoreResult<usize> {
    let dir_entries = std::fs::read_dir(data_dir)
        .map_err(|e| StoreError::io_at(data_dir, &e, "Failed to read data directory"))?;

    let mut removed = 0;
    for entry in dir_entries.flatten() {
        let is_temp = entry.file_name().to_str().is_some_and(|n| {
            n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(TEMP_SUFFIX)
        });
        if is_temp {
            let path = entry.path();
            std::fs::remove_file(&path)
                .map_err(|e| StoreError::io_at(&path, &e, "Failed to remove stale snapshot"))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Streams an ordered image into a new snapshot file.
pub struct SnapshotWriter {
    out: BufWriter<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    last_key: Option<Vec<u8>>,
    entries: usize,
    bytes: u64,
}

/// A snapshot that has been renamed into place.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

impl SnapshotWriter {
    /// Start writing the snapshot for WAL sequence `sequence`.
    pub fn create(data_dir: &Path, sequence: u64) -> StoreResult<Self> {
        let final_path = data_dir.join(snapshot_name(sequence));
        let temp_path = data_dir.join(format!("{}{}", snapshot_name(sequence), TEMP_SUFFIX));

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StoreError::io_at(&temp_path, &e, "Failed to create snapshot"))?;

        Ok(Self {
            out: BufWriter::new(file),
            temp_path,
            final_path,
            last_key: None,
            entries: 0,
            bytes: 0,
        })
    }

    /// Append one entry. Keys must arrive in strictly ascending order.
    pub fn write_entry(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        crate::format::check_sizes(key, value, MAX_KEY_SIZE, MAX_VALUE_SIZE)?;

        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(StoreError::SnapshotCorrupted {
                    path: self.temp_path.clone(),
                    offset: self.bytes,
                    reason: "keys written out of order".to_string(),
                });
            }
        }

        let header = SnapshotRecordHeader::new(
            key.len() as u16,
            value.len() as u32,
            record_checksum(key, value),
        );

        let write = |out: &mut BufWriter<File>| -> std::io::Result<()> {
            out.write_all(&header.to_bytes())?;
            out.write_all(key)?;
            out.write_all(value)
        };
        write(&mut self.out)
            .map_err(|e| StoreError::io_at(&self.temp_path, &e, "Snapshot write failed"))?;

        self.bytes += (RECORD_HEADER_SIZE + key.len() + value.len()) as u64;
        self.entries += 1;
        self.last_key = Some(key.to_vec());
        Ok(())
    }

    /// Flush, sync, and atomically rename the snapshot into place.
    pub fn finish(self) -> StoreResult<SnapshotInfo> {
        let SnapshotWriter { out, temp_path, final_path, entries, bytes, .. } = self;

        let file = out.into_inner()
            .map_err(|e| StoreError::io_at(&temp_path, e.error(), "Snapshot flush failed"))?;
        durable_sync(&file)
            .map_err(|e| StoreError::io_at(&temp_path, &e, "Snapshot durable_sync failed"))?;
        drop(file);

        std::fs::rename(&temp_path, &final_path)
            .map_err(|e| StoreError::io_at(&final_path, &e, "Failed to rename snapshot into place"))?;

        if let Some(parent) = final_path.parent() {
            sync_directory(parent)
                .map_err(|e| StoreError::io_at(parent, &e, "Failed to sync data directory"))?;
        }

        debug!(snapshot = %final_path.display(), entries, bytes, "snapshot written");
        Ok(SnapshotInfo { path: final_path, entries, bytes })
    }
}

/// Reads snapshot files back.
pub struct SnapshotReader;

impl SnapshotReader {
    /// Load every entry of a snapshot, verifying magic, checksum, and order.
    ///
    /// Any damage is an error: a renamed snapshot was fully synced first.
    pub fn load(path: &Path) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let buffer = std::fs::read(path)
            .map_err(|e| StoreError::io_at(path, &e, "Failed to read snapshot"))?;

        let corrupted = |offset: usize, reason: String| StoreError::SnapshotCorrupted {
            path: path.to_path_buf(),
            offset: offset as u64,
            reason,
        };

        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        let mut offset = 0usize;

        while offset < buffer.len() {
            if offset + RECORD_HEADER_SIZE > buffer.len() {
                return Err(corrupted(offset, "truncated record header".to_string()));
            }
            let hdr = SnapshotRecordHeader::from_bytes(&buffer[offset..offset + RECORD_HEADER_SIZE]);

            if hdr.magic != MAGIC_ARRAY {
                return Err(StoreError::NoMagicFound {
                    path: path.to_path_buf(),
                    offset: offset as u64,
                    found_bytes: hdr.magic,
                });
            }
            if hdr.key_len as usize > MAX_KEY_SIZE || hdr.value_len as usize > MAX_VALUE_SIZE {
                return Err(corrupted(offset, format!(
                    "record sizes key={} value={} exceed limits", hdr.key_len, hdr.value_len)));
            }

            let key_start = offset + RECORD_HEADER_SIZE;
            let value_start = key_start + hdr.key_len as usize;
            let end = value_start + hdr.value_len as usize;
            if end > buffer.len() {
                return Err(corrupted(offset, "truncated record body".to_string()));
            }

            let key = &buffer[key_start..value_start];
            let value = &buffer[value_start..end];

            let computed = record_checksum(key, value);
            if computed != hdr.checksum {
                return Err(StoreError::ChecksumMismatch {
                    path: path.to_path_buf(),
                    expected: hdr.checksum,
                    actual: computed,
                    offset: offset as u64,
                });
            }

            if let Some((last, _)) = entries.last() {
                if key <= last.as_slice() {
                    return Err(corrupted(offset, "keys out of order".to_string()));
                }
            }

            entries.push((key.to_vec(), value.to_vec()));
            offset = end;
        }

        Ok(entries)
    }
}
