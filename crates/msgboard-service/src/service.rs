//! Message lifecycle: create, read, update, delete, list, search.

use std::path::Path;

use msgboard_store::Config;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{BoardError, BoardResult};
use crate::message::{Message, MessagePatch, NewMessage};
use crate::record_store::RecordStore;
use crate::search::SearchView;

/// Mediates every message operation on top of a `RecordStore`.
///
/// Create, update, and delete serialize on `writes`, which makes the
/// read-merge-write of `update` atomic against other writers. Reads go
/// straight to the store.
pub struct MessageService<C: Clock = SystemClock> {
    store: RecordStore,
    clock: C,
    writes: Mutex<()>,
}

impl MessageService<SystemClock> {
    pub fn new(store: RecordStore) -> Self {
        Self::with_clock(store, SystemClock)
    }

    /// Open the store at `path` and wrap it in a service.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> BoardResult<Self> {
        Ok(Self::new(RecordStore::open(path, config)?))
    }
}

impl<C: Clock> MessageService<C> {
    pub fn with_clock(store: RecordStore, clock: C) -> Self {
        Self { store, clock, writes: Mutex::new(()) }
    }

    /// Store a new message with a fresh id and `created_at = now`.
    pub fn create(&self, fields: NewMessage) -> BoardResult<Message> {
        let _guard = self.writes.lock();

        let id = loop {
            let candidate = Uuid::new_v4().to_string();
            if !self.store.contains(&candidate) {
                break candidate;
            }
        };

        let message = Message::create(id, fields, self.clock.now());
        self.store.insert(&message.id, &message)?;
        debug!(id = %message.id, "message created");
        Ok(message)
    }

    pub fn get(&self, id: &str) -> BoardResult<Message> {
        self.store.get(id)?.ok_or_else(|| BoardError::not_found(id))
    }

    /// Merge `patch` into the stored record and stamp `updated_at`.
    pub fn update(&self, id: &str, patch: MessagePatch) -> BoardResult<Message> {
        let _guard = self.writes.lock();

        let mut message = self.store.get(id)?.ok_or_else(|| BoardError::not_found(id))?;
        message.apply(patch, self.clock.now());
        self.store.insert(id, &message)?;
        debug!(id, "message updated");
        Ok(message)
    }

    pub fn delete(&self, id: &str) -> BoardResult<Message> {
        let _guard = self.writes.lock();

        let removed = self.store.remove(id)?.ok_or_else(|| BoardError::not_found(id))?;
        debug!(id, "message deleted");
        Ok(removed)
    }

    /// All messages in ascending id order.
    pub fn list(&self) -> BoardResult<Vec<Message>> {
        self.store.values()
    }

    pub fn search(&self, query: &str) -> BoardResult<Vec<Message>> {
        SearchView::new(&self.store).search(query)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Sync and release the underlying store.
    pub fn close(self) -> BoardResult<()> {
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service() -> (MessageService, TempDir) {
        let dir = TempDir::new().unwrap();
        let svc = MessageService::open(dir.path(), Config::default()).unwrap();
        (svc, dir)
    }

    /// Clock that returns whatever the test last set.
    fn manual_clock(start: i64) -> (Arc<AtomicI64>, impl Clock) {
        let secs = Arc::new(AtomicI64::new(start));
        let handle = Arc::clone(&secs);
        let clock = move || -> DateTime<Utc> {
            Utc.timestamp_opt(handle.load(Ordering::SeqCst), 0).unwrap()
        };
        (secs, clock)
    }

    #[test]
    fn test_create_assigns_server_fields() {
        let (svc, _dir) = service();
        let m = svc.create(NewMessage::new("t", "b")).unwrap();

        assert!(Uuid::parse_str(&m.id).is_ok());
        assert!(m.updated_at.is_none());
        assert_eq!(svc.get(&m.id).unwrap(), m);
    }

    #[test]
    fn test_create_ids_are_unique() {
        let (svc, _dir) = service();
        let mut ids: Vec<String> = (0..50)
            .map(|_| svc.create(NewMessage::default()).unwrap().id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_missing_id_is_not_found_everywhere() {
        let (svc, _dir) = service();
        assert!(svc.get("ghost").unwrap_err().is_not_found());
        assert!(svc.update("ghost", MessagePatch::body("x")).unwrap_err().is_not_found());
        assert!(svc.delete("ghost").unwrap_err().is_not_found());
        assert!(svc.store().is_empty());
    }

    #[test]
    fn test_second_delete_is_not_found() {
        let (svc, _dir) = service();
        let m = svc.create(NewMessage::new("x", "y")).unwrap();
        assert_eq!(svc.delete(&m.id).unwrap(), m);
        assert!(svc.delete(&m.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_uses_clock_and_stays_monotonic() {
        let dir = TempDir::new().unwrap();
        let (secs, clock) = manual_clock(1_000);
        let svc = MessageService::with_clock(
            RecordStore::open(dir.path(), Config::default()).unwrap(),
            clock,
        );

        let m = svc.create(NewMessage::new("t", "b")).unwrap();
        assert_eq!(m.created_at.timestamp(), 1_000);

        secs.store(2_000, Ordering::SeqCst);
        let u1 = svc.update(&m.id, MessagePatch::title("t2")).unwrap();
        assert_eq!(u1.updated_at.unwrap().timestamp(), 2_000);

        // Wall clock stepped backwards
        secs.store(1_500, Ordering::SeqCst);
        let u2 = svc.update(&m.id, MessagePatch::body("b2")).unwrap();
        assert_eq!(u2.updated_at.unwrap().timestamp(), 2_000);
        assert_eq!(u2.created_at, m.created_at);
        assert_eq!(u2.title, "t2");
    }

    #[test]
    fn test_list_reflects_mutations() {
        let (svc, _dir) = service();
        let a = svc.create(NewMessage::new("a", "")).unwrap();
        let b = svc.create(NewMessage::new("b", "")).unwrap();
        assert_eq!(svc.list().unwrap().len(), 2);

        svc.delete(&a.id).unwrap();
        assert_eq!(svc.list().unwrap(), vec![b]);
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_fields() {
        let (svc, _dir) = service();
        let svc = Arc::new(svc);
        let m = svc.create(NewMessage::new("t", "b")).unwrap();

        let title_writer = {
            let svc = Arc::clone(&svc);
            let id = m.id.clone();
            std::thread::spawn(move || {
                for i in 0..20 {
                    svc.update(&id, MessagePatch::title(format!("title-{}", i))).unwrap();
                }
            })
        };
        let body_writer = {
            let svc = Arc::clone(&svc);
            let id = m.id.clone();
            std::thread::spawn(move || {
                for i in 0..20 {
                    svc.update(&id, MessagePatch::body(format!("body-{}", i))).unwrap();
                }
            })
        };
        title_writer.join().unwrap();
        body_writer.join().unwrap();

        let last = svc.get(&m.id).unwrap();
        assert_eq!(last.title, "title-19");
        assert_eq!(last.body, "body-19");
    }
}
