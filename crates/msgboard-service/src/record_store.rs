//! Typed record store: `Message` values keyed by id over `StoreEngine`.
//!
//! Keys are the id's UTF-8 bytes, values the JSON encoding of the record,
//! so iteration order is ascending id order.

use std::path::Path;

use msgboard_store::{CheckpointStats, Config, StoreEngine, StoreError};

use crate::error::{BoardError, BoardResult};
use crate::message::Message;

/// Durable ordered map from id to `Message`.
///
/// Absence is always `Ok(None)`; errors mean the disk or a stored record
/// is damaged.
pub struct RecordStore {
    engine: StoreEngine,
}

fn decode(bytes: &[u8]) -> BoardResult<Message> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_opt(bytes: Option<Vec<u8>>) -> BoardResult<Option<Message>> {
    bytes.as_deref().map(decode).transpose()
}

impl RecordStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> BoardResult<Self> {
        Ok(Self::from_engine(StoreEngine::open(path, config)?))
    }

    pub fn from_engine(engine: StoreEngine) -> Self {
        Self { engine }
    }

    /// Sync and release the store.
    pub fn close(self) -> BoardResult<()> {
        Ok(self.engine.close()?)
    }

    /// Upsert `message` under `id`, returning the record it replaced.
    ///
    /// A record too large for the configured limits is `InvalidInput`; the
    /// store is left untouched.
    pub fn insert(&self, id: &str, message: &Message) -> BoardResult<Option<Message>> {
        let value = serde_json::to_vec(message)?;
        let previous = self.engine.put(id.as_bytes(), &value).map_err(|e| match e {
            StoreError::OversizedEntry { .. } => BoardError::InvalidInput {
                reason: format!("message too large: {}", e),
            },
            other => BoardError::Store(other),
        })?;
        decode_opt(previous)
    }

    pub fn get(&self, id: &str) -> BoardResult<Option<Message>> {
        decode_opt(self.engine.get(id.as_bytes()))
    }

    /// Delete the record under `id`, returning it if there was one.
    pub fn remove(&self, id: &str) -> BoardResult<Option<Message>> {
        decode_opt(self.engine.delete(id.as_bytes())?)
    }

    /// Every record in ascending id order, from one consistent snapshot.
    pub fn values(&self) -> BoardResult<Vec<Message>> {
        self.engine.values().iter().map(|v| decode(v)).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.engine.contains_key(id.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.engine.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
    }

    pub fn checkpoint(&self) -> BoardResult<CheckpointStats> {
        Ok(self.engine.checkpoint()?)
    }

    pub fn engine(&self) -> &StoreEngine {
        &self.engine
    }
}
