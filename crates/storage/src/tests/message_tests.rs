use botstore_core::{ComplexityLevel, NewMessage, SourceRef};
use chrono::{TimeZone as _, Utc};

use super::{create_test_session, create_test_storage, create_test_user, exchange, raw_execute};
use crate::StorageError;

#[test]
fn test_save_message_with_sources() {
    let (storage, _temp_dir) = create_test_storage();
    let message = exchange("tok-1", 1)
        .with_sources(&["Rust Book: https://doc.rust-lang.org/book/"])
        .unwrap()
        .with_complexity(ComplexityLevel::Simple);

    let saved = storage.save_message(&message).unwrap();
    assert!(saved.id > 0);
    assert_eq!(saved.complexity_level, Some(ComplexityLevel::Simple));
    assert_eq!(
        saved.source_refs().unwrap(),
        vec![SourceRef::new("Rust Book", "https://doc.rust-lang.org/book/")]
    );
}

#[test]
fn test_empty_sources_stored_as_null() {
    let (storage, _temp_dir) = create_test_storage();
    let no_sources: [&str; 0] = [];
    let message = exchange("tok-1", 1).with_sources(&no_sources).unwrap();

    let saved = storage.save_message(&message).unwrap();
    assert_eq!(saved.sources, None);
    assert!(saved.source_list().unwrap().is_empty());
}

#[test]
fn test_message_for_unknown_session_is_accepted() {
    let (storage, _temp_dir) = create_test_storage();
    let saved = storage.save_message(&exchange("never-created", 1)).unwrap();
    assert_eq!(saved.session_id, "never-created");
    assert!(storage.get_session_by_token("never-created").unwrap().is_none());
}

#[test]
fn test_history_returns_most_recent_in_chronological_order() {
    let (storage, _temp_dir) = create_test_storage();
    for n in 1..=5 {
        storage.save_message(&exchange("tok-h", n)).unwrap();
    }
    storage.save_message(&exchange("tok-other", 99)).unwrap();

    let all = storage.get_session_messages("tok-h", 50).unwrap();
    let questions: Vec<&str> = all.iter().map(|m| m.user_message.as_str()).collect();
    assert_eq!(questions, ["question 1", "question 2", "question 3", "question 4", "question 5"]);

    let recent = storage.get_session_messages("tok-h", 2).unwrap();
    let questions: Vec<&str> = recent.iter().map(|m| m.user_message.as_str()).collect();
    assert_eq!(questions, ["question 4", "question 5"]);
}

#[test]
fn test_messages_between_is_half_open() {
    let (storage, _temp_dir) = create_test_storage();
    for n in 0..3 {
        storage.save_message(&exchange("tok-r", n)).unwrap();
    }
    for (id, hour) in [(1, 10), (2, 11), (3, 12)] {
        let sql = format!(
            "UPDATE messages SET created_at = '2024-01-01T{hour}:00:00.000Z' WHERE id = {id}"
        );
        raw_execute(&storage, &sql).unwrap();
    }

    let ten = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
    let eleven = Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap();
    let noon = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

    let ids = |from, to| -> Vec<i64> {
        storage.get_messages_between(from, to, 100).unwrap().iter().map(|m| m.id).collect()
    };
    assert_eq!(ids(Some(ten), Some(noon)), [1, 2]);
    assert_eq!(ids(None, Some(eleven)), [1]);
    assert_eq!(ids(Some(eleven), None), [2, 3]);
    assert_eq!(ids(None, None), [1, 2, 3]);
    assert!(ids(Some(noon), Some(noon)).is_empty());
}

#[test]
fn test_count_user_messages_joins_through_sessions() {
    let (storage, _temp_dir) = create_test_storage();
    let user = create_test_user(&storage, "500");
    let other = create_test_user(&storage, "501");
    create_test_session(&storage, "mine-1", Some(user.id));
    create_test_session(&storage, "mine-2", Some(user.id));
    create_test_session(&storage, "theirs", Some(other.id));

    storage.save_message(&exchange("mine-1", 1)).unwrap();
    storage.save_message(&exchange("mine-2", 2)).unwrap();
    storage.save_message(&exchange("mine-2", 3)).unwrap();
    storage.save_message(&exchange("theirs", 4)).unwrap();
    storage.save_message(&exchange("orphan", 5)).unwrap();

    assert_eq!(storage.count_user_messages(user.id).unwrap(), 3);
    assert_eq!(storage.count_user_messages(other.id).unwrap(), 1);
}

#[test]
fn test_required_message_fields_enforced_by_store() {
    let (storage, _temp_dir) = create_test_storage();
    let err = StorageError::from(
        raw_execute(
            &storage,
            "INSERT INTO messages (session_id, user_message, bot_response) VALUES ('t', NULL, 'a')",
        )
        .unwrap_err(),
    );
    assert!(matches!(err, StorageError::MissingValue(_)), "unexpected error: {err:?}");
}

#[test]
fn test_invalid_message_rejected_before_insert() {
    let (storage, _temp_dir) = create_test_storage();
    let err = storage.save_message(&NewMessage::new("", "q", "a")).unwrap_err();
    assert!(matches!(err, StorageError::Invalid(_)));

    let mut bad_sources = exchange("tok-1", 1);
    bad_sources.sources = Some("not json".to_owned());
    let err = storage.save_message(&bad_sources).unwrap_err();
    assert!(matches!(err, StorageError::Invalid(_)));
}

#[test]
fn test_unknown_stored_complexity_reads_as_none() {
    let (storage, _temp_dir) = create_test_storage();
    let saved = storage.save_message(&exchange("tok-c", 1)).unwrap();
    raw_execute(&storage, "UPDATE messages SET complexity_level = 'galaxy-brain' WHERE id = 1")
        .unwrap();

    let read = storage.get_session_messages("tok-c", 10).unwrap();
    assert_eq!(read[0].id, saved.id);
    assert_eq!(read[0].complexity_level, None);
}
