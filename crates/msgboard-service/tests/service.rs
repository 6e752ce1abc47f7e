//! End-to-end behaviour of `MessageService` over a real on-disk store.

use msgboard_service::{MessagePatch, MessageService, NewMessage};
use msgboard_store::Config;
use tempfile::TempDir;

fn open(dir: &TempDir) -> MessageService {
    MessageService::open(dir.path(), Config::default()).unwrap()
}

#[test]
fn test_board_update_lifecycle() {
    let dir = TempDir::new().unwrap();
    let board = open(&dir);

    let created = board.create(NewMessage::new("Board update", "Meeting at noon")).unwrap();
    assert_eq!(board.list().unwrap(), vec![created.clone()]);
    assert_eq!(board.search("meeting").unwrap(), vec![created.clone()]);

    let updated = board.update(&created.id, MessagePatch::body("Meeting at 1pm")).unwrap();
    assert_eq!(updated.body, "Meeting at 1pm");
    assert_eq!(updated.title, "Board update");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at.unwrap() >= created.created_at);

    let deleted = board.delete(&created.id).unwrap();
    assert_eq!(deleted, updated);
    assert!(board.get(&created.id).unwrap_err().is_not_found());
    assert!(board.list().unwrap().is_empty());
}

#[test]
fn test_deleted_id_behaves_like_unknown_id() {
    let dir = TempDir::new().unwrap();
    let board = open(&dir);

    let m = board.create(NewMessage::new("gone", "soon")).unwrap();
    board.delete(&m.id).unwrap();

    assert!(board.get(&m.id).unwrap_err().is_not_found());
    assert!(board.update(&m.id, MessagePatch::title("back")).unwrap_err().is_not_found());
    assert!(board.delete(&m.id).unwrap_err().is_not_found());
}

#[test]
fn test_list_is_stable_without_mutation() {
    let dir = TempDir::new().unwrap();
    let board = open(&dir);
    for i in 0..10 {
        board.create(NewMessage::new(format!("t{}", i), "")).unwrap();
    }

    let first = board.list().unwrap();
    let second = board.list().unwrap();
    assert_eq!(first, second);

    let ids: Vec<&str> = first.iter().map(|m| m.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_messages_survive_reopen() {
    let dir = TempDir::new().unwrap();

    let (kept, edited) = {
        let board = open(&dir);
        let kept = board.create(NewMessage::new("keep", "me")).unwrap();
        let edited = board.create(NewMessage::new("edit", "me")).unwrap();
        let dropped = board.create(NewMessage::new("drop", "me")).unwrap();
        let edited = board
            .update(&edited.id, MessagePatch::attachment_url("https://example.com/a.png"))
            .unwrap();
        board.delete(&dropped.id).unwrap();
        board.close().unwrap();
        (kept, edited)
    };

    let board = open(&dir);
    assert_eq!(board.get(&kept.id).unwrap(), kept);
    assert_eq!(board.get(&edited.id).unwrap(), edited);
    assert_eq!(board.list().unwrap().len(), 2);
}

#[test]
fn test_messages_survive_checkpoint_and_reopen() {
    let dir = TempDir::new().unwrap();

    let before = {
        let board = open(&dir);
        for i in 0..20 {
            board.create(NewMessage::new(format!("n{}", i), "before")).unwrap();
        }
        board.store().checkpoint().unwrap();
        board.create(NewMessage::new("late", "after checkpoint")).unwrap();
        let all = board.list().unwrap();
        board.close().unwrap();
        all
    };

    let board = open(&dir);
    assert_eq!(board.list().unwrap(), before);
    assert_eq!(board.search("AFTER").unwrap().len(), 1);
}

#[test]
fn test_search_rejects_empty_query() {
    let dir = TempDir::new().unwrap();
    let board = open(&dir);
    board.create(NewMessage::new("anything", "")).unwrap();
    assert!(board.search("").unwrap_err().is_invalid_input());
}
