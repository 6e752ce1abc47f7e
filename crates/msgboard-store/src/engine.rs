//! Core storage engine.
//!
//! `StoreEngine` keeps the live image in an ordered map and makes every
//! mutation durable through the WAL before applying it.
//!
//! **Read path**: straight from the in-memory `BTreeMap` under a read lock
//! **Write path**: WAL append (and sync), then the map, under the WAL mutex
//! **Checkpoint**: snapshot the map, drop WAL segments it covers

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::checkpoint::{write_checkpoint, CheckpointStats};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::format::{check_sizes, Operation};
use crate::snapshot::{list_snapshots, remove_temp_files, SnapshotReader};
use crate::wal::{list_segments, WalReader, WalWriter};

struct WalState {
    writer: WalWriter,
    /// WAL bytes written since the last checkpoint (or found at open)
    bytes_since_checkpoint: u64,
    /// `bytes_since_checkpoint` level that triggers the next automatic
    /// checkpoint; pushed forward after a failed attempt
    next_checkpoint_at: u64,
}

/// Durable ordered map from byte keys to byte values.
///
/// All methods take `&self`. Readers share the map's `RwLock`; writers
/// serialize on the WAL mutex and hold it across the map update, so WAL
/// order always equals apply order. Lock order is WAL, then map.
pub struct StoreEngine {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    wal: Mutex<WalState>,
    path: PathBuf,
    wal_dir: PathBuf,
    data_dir: PathBuf,
    config: Config,
}

impl StoreEngine {
    /// Open or create a store at `path`.
    ///
    /// Loads the newest snapshot, replays the WAL segments written after it,
    /// and opens a fresh WAL segment for new writes.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> StoreResult<Self> {
        config.validate().map_err(|reason| StoreError::InvalidConfig { reason })?;

        let path = path.as_ref().to_path_buf();
        let wal_dir = path.join("wal");
        let data_dir = path.join("data");

        for dir in [&wal_dir, &data_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::io_at(dir, &e, "Failed to create store directory"))?;
        }

        let stale = remove_temp_files(&data_dir)?;
        if stale > 0 {
            warn!(count = stale, "removed unfinished snapshot files");
        }

        let mut data = BTreeMap::new();
        let mut replay_from = 0;
        if let Some((seq, snapshot)) = list_snapshots(&data_dir)?.pop() {
            for (key, value) in SnapshotReader::load(&snapshot)? {
                data.insert(key, value);
            }
            replay_from = seq;
            debug!(snapshot = %snapshot.display(), entries = data.len(), "snapshot loaded");
        }

        let records = WalReader::new(&wal_dir).recover_entries_from(replay_from)?;
        for record in &records {
            match record.operation {
                Operation::Put => {
                    data.insert(record.key.clone(), record.value.clone());
                }
                Operation::Delete => {
                    data.remove(&record.key);
                }
            }
        }

        let mut bytes_since_checkpoint = 0;
        for (seq, segment) in list_segments(&wal_dir)? {
            if seq >= replay_from {
                bytes_since_checkpoint += std::fs::metadata(&segment)
                    .map_err(|e| StoreError::io_at(&segment, &e, "Failed to stat WAL segment"))?
                    .len();
            }
        }

        info!(
            path = %path.display(),
            entries = data.len(),
            wal_records = records.len(),
            "store opened"
        );

        let writer = WalWriter::open(&wal_dir, config.wal_rotation_size_bytes, replay_from)?;

        Ok(Self {
            data: RwLock::new(data),
            wal: Mutex::new(WalState {
                writer,
                bytes_since_checkpoint,
                next_checkpoint_at: config.checkpoint_wal_bytes.unwrap_or(u64::MAX),
            }),
            path,
            wal_dir,
            data_dir,
            config,
        })
    }

    /// Sync the WAL and release the store.
    pub fn close(self) -> StoreResult<()> {
        self.sync_wal()?;
        info!(path = %self.path.display(), entries = self.len(), "store closed");
        Ok(())
    }

    /// Value stored under `key`, or `None`. Never touches disk.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Store `value` under `key`, returning the value it replaced.
    ///
    /// WRITE ORDERING:
    /// 1. WAL append (synced when `sync_writes` is on)
    /// 2. map insert
    ///
    /// If the WAL append fails, the map is NEVER modified.
    pub fn put(&self, key: &[u8], value: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        check_sizes(key, value, self.config.max_key_size, self.config.max_value_size)?;

        let (previous, due) = {
            let mut wal = self.wal.lock();
            let written = wal.writer.append(key, value, Operation::Put, self.config.sync_writes)?;
            wal.bytes_since_checkpoint += written;
            let previous = self.data.write().insert(key.to_vec(), value.to_vec());
            (previous, wal.bytes_since_checkpoint >= wal.next_checkpoint_at)
        };

        if due {
            self.auto_checkpoint();
        }
        Ok(previous)
    }

    /// Remove `key`, returning the value it held.
    ///
    /// Removing an absent key writes nothing and returns `None`.
    pub fn delete(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let (removed, due) = {
            let mut wal = self.wal.lock();
            if !self.data.read().contains_key(key) {
                return Ok(None);
            }
            let written = wal.writer.append(key, &[], Operation::Delete, self.config.sync_writes)?;
            wal.bytes_since_checkpoint += written;
            let removed = self.data.write().remove(key);
            (removed, wal.bytes_since_checkpoint >= wal.next_checkpoint_at)
        };

        if due {
            self.auto_checkpoint();
        }
        Ok(removed)
    }

    /// All values in ascending key order, copied out under one read lock.
    pub fn values(&self) -> Vec<Vec<u8>> {
        self.data.read().values().cloned().collect()
    }

    /// All key-value pairs in ascending key order, copied out under one read lock.
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Force buffered WAL records to persistent storage.
    ///
    /// Only needed with `sync_writes` off; makes a batch durable with one sync.
    pub fn sync_wal(&self) -> StoreResult<()> {
        self.wal.lock().writer.sync()
    }

    /// Write a snapshot of the current image and delete the WAL it replaces.
    ///
    /// Writers block for the duration; readers keep going. On failure the
    /// unfinished snapshot file is removed and the WAL is left intact.
    pub fn checkpoint(&self) -> StoreResult<CheckpointStats> {
        let mut wal = self.wal.lock();
        let wal_bytes = wal.bytes_since_checkpoint;
        let sequence = wal.writer.rotate()?;

        let data = self.data.read();
        let result = write_checkpoint(
            &self.data_dir,
            &self.wal_dir,
            sequence,
            data.iter().map(|(k, v)| (k.as_slice(), v.as_slice())),
        );

        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                if let Err(cleanup) = remove_temp_files(&self.data_dir) {
                    debug!(error = %cleanup, "snapshot temp cleanup failed");
                }
                return Err(e);
            }
        };

        debug!(wal_bytes, sequence, "WAL folded into snapshot");
        wal.bytes_since_checkpoint = 0;
        wal.next_checkpoint_at = self.checkpoint_limit();
        Ok(stats)
    }

    fn checkpoint_limit(&self) -> u64 {
        self.config.checkpoint_wal_bytes.unwrap_or(u64::MAX)
    }

    /// The triggering write is already durable, so a failed automatic
    /// checkpoint is logged rather than reported to that writer. The next
    /// attempt waits for another full threshold of WAL bytes.
    fn auto_checkpoint(&self) {
        if let Err(e) = self.checkpoint() {
            let mut wal = self.wal.lock();
            wal.next_checkpoint_at = wal.bytes_since_checkpoint.saturating_add(self.checkpoint_limit());
            warn!(error = %e, retry_at = wal.next_checkpoint_at, "automatic checkpoint failed");
        }
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.data.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Store root directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// WAL bytes accumulated since the last checkpoint.
    pub fn wal_bytes(&self) -> u64 {
        self.wal.lock().bytes_since_checkpoint
    }
}

impl Drop for StoreEngine {
    fn drop(&mut self) {
        if !self.config.sync_writes {
            if let Err(e) = self.wal.get_mut().writer.sync() {
                warn!(error = %e, "WAL sync on drop failed");
            }
        }
    }
}
