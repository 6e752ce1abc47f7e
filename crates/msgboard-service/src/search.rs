//! Case-insensitive substring search over titles and bodies.
//!
//! A linear scan of the store's current values; nothing is indexed.

use crate::error::{BoardError, BoardResult};
use crate::message::Message;
use crate::record_store::RecordStore;

/// Read-only search view over a `RecordStore`.
pub struct SearchView<'a> {
    store: &'a RecordStore,
}

impl<'a> SearchView<'a> {
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Records whose lowercased title or body contains the lowercased
    /// `query`, in store order. An empty query is rejected.
    pub fn search(&self, query: &str) -> BoardResult<Vec<Message>> {
        if query.is_empty() {
            return Err(BoardError::InvalidInput {
                reason: "search query must not be empty".to_string(),
            });
        }

        let needle = query.to_lowercase();
        let mut hits = self.store.values()?;
        hits.retain(|m| matches(m, &needle));
        Ok(hits)
    }
}

/// `needle` must already be lowercase.
pub fn matches(message: &Message, needle: &str) -> bool {
    message.title.to_lowercase().contains(needle) || message.body.to_lowercase().contains(needle)
}
