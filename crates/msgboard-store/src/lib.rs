//! Msgboard Store — durable ordered key-value engine
//!
//! An ordered in-memory map made crash-safe by a write-ahead log, with
//! periodic snapshots so the log never grows without bound.
//!
//! # Architecture
//!
//! - **Read path**: served from a `BTreeMap` in RAM, ascending key order
//! - **Write path**: WAL-first, then RAM (crash-safe)
//! - **Checkpoint**: ordered snapshot written atomically, superseded WAL deleted
//! - **Recovery**: newest snapshot + WAL segments written after it
//!
//! The engine stores opaque bytes. Record types and their encoding live in
//! the crates built on top of it.

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod platform_durability;
pub mod snapshot;
pub mod wal;

pub use checkpoint::CheckpointStats;
pub use config::Config;
pub use engine::StoreEngine;
pub use error::{StoreError, StoreResult};
pub use format::Operation;
pub use snapshot::{SnapshotReader, SnapshotWriter};
pub use wal::{WalReader, WalWriter};
