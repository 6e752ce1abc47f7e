//! Property tests for the message service.

use msgboard_service::{MessagePatch, MessageService, NewMessage};
use msgboard_store::Config;
use proptest::prelude::*;
use tempfile::TempDir;

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-zA-Z ]{1,24}",
        "(hello|Hello|HELLO|world|meeting)( [a-z]{1,6}){0,3}",
        any::<String>(),
    ]
}

fn arb_new_message() -> impl Strategy<Value = NewMessage> {
    (arb_text(), arb_text(), "(https://[a-z]{1,8}\\.example/[a-z]{1,8})?").prop_map(
        |(title, body, url)| NewMessage::new(title, body).with_attachment(url),
    )
}

fn arb_patch() -> impl Strategy<Value = MessagePatch> {
    (
        proptest::option::of(arb_text()),
        proptest::option::of(arb_text()),
        proptest::option::of("[a-z:/.]{0,16}"),
    )
        .prop_map(|(title, body, attachment_url)| MessagePatch { title, body, attachment_url })
}

fn board() -> (MessageService, TempDir) {
    let dir = TempDir::new().unwrap();
    let board = MessageService::open(dir.path(), Config::relaxed()).unwrap();
    (board, dir)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn created_message_reads_back_exactly(fields in arb_new_message()) {
        let (board, _dir) = board();
        let created = board.create(fields.clone()).unwrap();

        prop_assert_eq!(&created.title, &fields.title);
        prop_assert_eq!(&created.body, &fields.body);
        prop_assert_eq!(&created.attachment_url, &fields.attachment_url);
        prop_assert!(created.updated_at.is_none());
        prop_assert_eq!(board.get(&created.id).unwrap(), created);
    }

    #[test]
    fn update_merges_only_present_fields(fields in arb_new_message(), patch in arb_patch()) {
        let (board, _dir) = board();
        let before = board.create(fields).unwrap();
        let after = board.update(&before.id, patch.clone()).unwrap();

        prop_assert_eq!(&after.title, patch.title.as_ref().unwrap_or(&before.title));
        prop_assert_eq!(&after.body, patch.body.as_ref().unwrap_or(&before.body));
        prop_assert_eq!(
            &after.attachment_url,
            patch.attachment_url.as_ref().unwrap_or(&before.attachment_url)
        );
        prop_assert_eq!(&after.id, &before.id);
        prop_assert_eq!(after.created_at, before.created_at);
        prop_assert!(after.updated_at.unwrap() >= before.created_at);

        let again = board.update(&before.id, MessagePatch::default()).unwrap();
        prop_assert!(again.updated_at >= after.updated_at);
        prop_assert_eq!(board.get(&before.id).unwrap(), again);
    }

    #[test]
    fn search_equals_naive_filter(
        messages in proptest::collection::vec(arb_new_message(), 0..12),
        query in "[a-zA-Z ]{1,6}|hello|HeLLo|meeting",
    ) {
        let (board, _dir) = board();
        for fields in messages {
            board.create(fields).unwrap();
        }

        let needle = query.to_lowercase();
        let expected: Vec<_> = board
            .list()
            .unwrap()
            .into_iter()
            .filter(|m| {
                m.title.to_lowercase().contains(&needle) || m.body.to_lowercase().contains(&needle)
            })
            .collect();

        prop_assert_eq!(board.search(&query).unwrap(), expected);
    }
}
