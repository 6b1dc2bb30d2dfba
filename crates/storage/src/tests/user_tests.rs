use std::thread::sleep;
use std::time::Duration;

use botstore_core::{ComplexityLevel, NewUser, ProfileUpdate};

use super::{create_test_storage, create_test_user, raw_execute};
use crate::StorageError;

#[test]
fn test_create_and_get_user() {
    let (storage, _temp_dir) = create_test_storage();
    let created = create_test_user(&storage, "1001");

    assert!(created.id > 0);
    assert_eq!(created.complexity_level, ComplexityLevel::Medium);
    assert_eq!(created.username.as_deref(), Some("user_1001"));
    assert_eq!(created.last_name, None);
    assert_eq!(created.created_at, created.updated_at);

    let by_telegram = storage.get_user_by_telegram_id("1001").unwrap().unwrap();
    assert_eq!(by_telegram, created);
    let by_id = storage.get_user(created.id).unwrap().unwrap();
    assert_eq!(by_id, created);
}

#[test]
fn test_get_missing_user_is_none() {
    let (storage, _temp_dir) = create_test_storage();
    assert!(storage.get_user(42).unwrap().is_none());
    assert!(storage.get_user_by_telegram_id("nobody").unwrap().is_none());
}

#[test]
fn test_explicit_complexity_is_stored() {
    let (storage, _temp_dir) = create_test_storage();
    let user = storage
        .create_user(&NewUser::new("2002").with_complexity(ComplexityLevel::Hard))
        .unwrap();
    assert_eq!(user.complexity_level, ComplexityLevel::Hard);
}

#[test]
fn test_duplicate_telegram_id_rejected() {
    let (storage, _temp_dir) = create_test_storage();
    create_test_user(&storage, "3003");

    let err = storage.create_user(&NewUser::new("3003")).unwrap_err();
    assert!(err.is_duplicate(), "unexpected error: {err:?}");
    assert_eq!(storage.get_user_by_telegram_id("3003").unwrap().unwrap().id, 1);
}

#[test]
fn test_invalid_user_rejected_before_insert() {
    let (storage, _temp_dir) = create_test_storage();

    let err = storage.create_user(&NewUser::new("")).unwrap_err();
    assert!(matches!(err, StorageError::Invalid(_)));

    let err = storage.create_user(&NewUser::new("9".repeat(51))).unwrap_err();
    assert!(matches!(err, StorageError::Invalid(_)));

    let long_name = ProfileUpdate { first_name: Some("x".repeat(101)), ..Default::default() };
    let err = storage.create_user(&NewUser::new("4004").with_profile(long_name)).unwrap_err();
    assert!(matches!(err, StorageError::Invalid(_)));
}

#[test]
fn test_store_enforces_width_and_not_null() {
    let (storage, _temp_dir) = create_test_storage();

    let too_long = format!("INSERT INTO users (telegram_id) VALUES ('{}')", "9".repeat(51));
    let err = StorageError::from(raw_execute(&storage, &too_long).unwrap_err());
    assert!(matches!(err, StorageError::Constraint(_)), "unexpected error: {err:?}");

    let err = StorageError::from(
        raw_execute(&storage, "INSERT INTO users (telegram_id) VALUES (NULL)").unwrap_err(),
    );
    assert!(matches!(err, StorageError::MissingValue(_)), "unexpected error: {err:?}");
}

#[test]
fn test_update_profile_only_touches_given_fields() {
    let (storage, _temp_dir) = create_test_storage();
    let before = create_test_user(&storage, "5005");
    sleep(Duration::from_millis(5));

    let update = ProfileUpdate { last_name: Some("Lovelace".to_owned()), ..Default::default() };
    let after = storage.update_user_profile("5005", &update).unwrap();

    assert_eq!(after.id, before.id);
    assert_eq!(after.username, before.username);
    assert_eq!(after.first_name, before.first_name);
    assert_eq!(after.last_name.as_deref(), Some("Lovelace"));
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn test_update_complexity_refreshes_updated_at() {
    let (storage, _temp_dir) = create_test_storage();
    let before = create_test_user(&storage, "6006");
    sleep(Duration::from_millis(5));

    let after = storage.update_user_complexity("6006", ComplexityLevel::Simple).unwrap();
    assert_eq!(after.complexity_level, ComplexityLevel::Simple);
    assert!(after.updated_at > before.updated_at);
}

#[test]
fn test_update_unknown_user_is_not_found() {
    let (storage, _temp_dir) = create_test_storage();
    let err = storage.update_user_complexity("ghost", ComplexityLevel::Hard).unwrap_err();
    assert!(err.is_not_found());

    let err = storage.update_user_profile("ghost", &ProfileUpdate::default()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_trigger_overrides_caller_supplied_updated_at() {
    let (storage, _temp_dir) = create_test_storage();
    let before = create_test_user(&storage, "7007");
    sleep(Duration::from_millis(5));

    raw_execute(
        &storage,
        "UPDATE users SET first_name = 'Grace', updated_at = '2000-01-01T00:00:00.000Z'
          WHERE telegram_id = '7007'",
    )
    .unwrap();

    let after = storage.get_user_by_telegram_id("7007").unwrap().unwrap();
    assert_eq!(after.first_name.as_deref(), Some("Grace"));
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.created_at, before.created_at);
}

#[test]
fn test_trigger_does_not_touch_other_tables() {
    let (storage, _temp_dir) = create_test_storage();
    let user = create_test_user(&storage, "8008");
    super::create_test_session(&storage, "tok-8008", Some(user.id));
    sleep(Duration::from_millis(5));

    storage.set_session_active("tok-8008", false).unwrap();
    let unchanged = storage.get_user(user.id).unwrap().unwrap();
    assert_eq!(unchanged.updated_at, user.updated_at);
}

#[test]
fn test_unknown_stored_complexity_falls_back_to_default() {
    let (storage, _temp_dir) = create_test_storage();
    create_test_user(&storage, "9009");
    raw_execute(
        &storage,
        "UPDATE users SET complexity_level = 'extreme' WHERE telegram_id = '9009'",
    )
    .unwrap();

    let user = storage.get_user_by_telegram_id("9009").unwrap().unwrap();
    assert_eq!(user.complexity_level, ComplexityLevel::Medium);
}
