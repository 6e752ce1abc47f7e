//! Store configuration
//!
//! Presets for the usual durability trade-offs plus `validate()`, which
//! `StoreEngine::open` runs before touching the disk.

use crate::format::{MAX_KEY_SIZE, MAX_VALUE_SIZE};

const MIB: u64 = 1024 * 1024;

/// Store configuration with durability presets
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// WAL segment rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Checkpoint once this many WAL bytes accumulate; `None` disables
    /// automatic checkpoints
    pub checkpoint_wal_bytes: Option<u64>,
    /// Sync the WAL after every write
    pub sync_writes: bool,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl Config {
    /// Every acknowledged write survives power loss.
    pub fn durable() -> Self {
        Self {
            wal_rotation_size_bytes: 64 * MIB,
            checkpoint_wal_bytes: Some(32 * MIB),
            sync_writes: true,
            max_key_size: MAX_KEY_SIZE,
            max_value_size: 1024 * 1024,
        }
    }

    /// Writes reach the OS page cache only; call `sync_wal` to persist a batch.
    pub fn relaxed() -> Self {
        Self {
            sync_writes: false,
            ..Self::durable()
        }
    }

    /// Small segments and frequent checkpoints for small devices and tests.
    pub fn compact() -> Self {
        Self {
            wal_rotation_size_bytes: MIB,
            checkpoint_wal_bytes: Some(256 * 1024),
            sync_writes: true,
            max_key_size: MAX_KEY_SIZE,
            max_value_size: 64 * 1024,
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.wal_rotation_size_bytes < 64 * 1024 {
            return Err("wal_rotation_size_bytes must be >= 64KB".into());
        }
        if let Some(limit) = self.checkpoint_wal_bytes {
            if limit == 0 {
                return Err("checkpoint_wal_bytes must be > 0 when set".into());
            }
        }
        if self.max_key_size == 0 || self.max_key_size > MAX_KEY_SIZE {
            return Err(format!("max_key_size must be in [1, {}]", MAX_KEY_SIZE));
        }
        if self.max_value_size == 0 || self.max_value_size > MAX_VALUE_SIZE {
            return Err("max_value_size must be in [1, 32MB]".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::durable() }
}
