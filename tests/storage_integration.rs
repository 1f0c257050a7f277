//! Integration tests for the storage layer.
//!
//! Uniqueness is enforced by the store, not by application logic; these
//! tests pin down the conflict semantics the rest of the crate builds on.

use snip::storage::{SqliteStorage, Storage, StorageError};
use std::sync::Arc;

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

#[tokio::test]
async fn duplicate_short_code_is_a_conflict() {
    let storage = create_test_storage().await;

    storage
        .insert_link("promo", "https://example.com/a", None, None)
        .await
        .unwrap();

    let err = storage
        .insert_link("promo", "https://example.com/b", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // The losing insert wrote nothing.
    let link = storage.find_link_by_code("promo").await.unwrap().unwrap();
    assert_eq!(link.original_url, "https://example.com/a");
}

#[tokio::test]
async fn concurrent_creation_of_same_code_has_one_winner() {
    let storage = create_test_storage().await;

    let mut handles = vec![];
    for i in 0..10 {
        let storage = Arc::clone(&storage);
        handles.push(tokio::spawn(async move {
            storage
                .insert_link("same_code", &format!("https://example.com/{i}"), None, None)
                .await
        }));
    }

    let mut success_count = 0;
    let mut conflict_count = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => success_count += 1,
            Err(StorageError::Conflict) => conflict_count += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(success_count, 1, "exactly one creation should succeed");
    assert_eq!(conflict_count, 9);
}

#[tokio::test]
async fn soft_deleted_code_still_blocks_reuse() {
    let storage = create_test_storage().await;
    let user = storage
        .insert_user("alice", "alice@example.com", "hash", false)
        .await
        .unwrap();

    let link = storage
        .insert_link("abc123", "https://example.com", Some(user.id), None)
        .await
        .unwrap();
    assert!(storage.deactivate_link(link.id, user.id).await.unwrap());

    // The row survives deactivation, so the unique column keeps rejecting.
    let err = storage
        .insert_link("abc123", "https://example.com/other", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let stored = storage.find_link_by_code("abc123").await.unwrap().unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn deactivate_is_owner_scoped() {
    let storage = create_test_storage().await;
    let owner = storage
        .insert_user("owner", "owner@example.com", "hash", false)
        .await
        .unwrap();
    let other = storage
        .insert_user("other", "other@example.com", "hash", false)
        .await
        .unwrap();

    let link = storage
        .insert_link("mine", "https://example.com", Some(owner.id), None)
        .await
        .unwrap();

    assert!(!storage.deactivate_link(link.id, other.id).await.unwrap());
    let stored = storage.find_link_by_id(link.id).await.unwrap().unwrap();
    assert!(stored.is_active, "foreign deactivate must not stick");

    assert!(storage.deactivate_link(link.id, owner.id).await.unwrap());
    let stored = storage.find_link_by_id(link.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
}

#[tokio::test]
async fn owner_listing_is_active_only_and_newest_first() {
    let storage = create_test_storage().await;
    let user = storage
        .insert_user("lister", "lister@example.com", "hash", false)
        .await
        .unwrap();

    let a = storage
        .insert_link("aaa", "https://example.com/a", Some(user.id), None)
        .await
        .unwrap();
    let b = storage
        .insert_link("bbb", "https://example.com/b", Some(user.id), None)
        .await
        .unwrap();
    let c = storage
        .insert_link("ccc", "https://example.com/c", Some(user.id), None)
        .await
        .unwrap();
    storage
        .insert_link("zzz", "https://example.com/z", None, None)
        .await
        .unwrap();

    storage.deactivate_link(b.id, user.id).await.unwrap();

    let links = storage.list_links_by_owner(user.id).await.unwrap();
    let ids: Vec<i64> = links.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![c.id, a.id]);
}

#[tokio::test]
async fn username_and_email_are_unique() {
    let storage = create_test_storage().await;

    storage
        .insert_user("dana", "dana@example.com", "hash", false)
        .await
        .unwrap();

    let err = storage
        .insert_user("dana", "new@example.com", "hash", false)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let err = storage
        .insert_user("dana2", "dana@example.com", "hash", false)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    assert_eq!(storage.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn deleting_a_user_detaches_links_and_drops_keys() {
    let storage = create_test_storage().await;
    let user = storage
        .insert_user("gone", "gone@example.com", "hash", false)
        .await
        .unwrap();
    let link = storage
        .insert_link("keepme", "https://example.com", Some(user.id), None)
        .await
        .unwrap();
    storage
        .insert_api_key(user.id, "snip_testkey", None, None)
        .await
        .unwrap();

    assert!(storage.delete_user(user.id).await.unwrap());

    // Link survives, anonymized; the key is gone with its user.
    let stored = storage.find_link_by_id(link.id).await.unwrap().unwrap();
    assert_eq!(stored.owner_id, None);
    assert!(storage
        .find_active_api_key("snip_testkey")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn api_key_lifecycle() {
    let storage = create_test_storage().await;
    let user = storage
        .insert_user("keyed", "keyed@example.com", "hash", false)
        .await
        .unwrap();

    let key = storage
        .insert_api_key(user.id, "snip_lifecycle", Some("ci"), None)
        .await
        .unwrap();
    assert!(key.is_active);
    assert_eq!(key.last_used_at, None);

    // Duplicate key strings are rejected.
    let err = storage
        .insert_api_key(user.id, "snip_lifecycle", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    storage.touch_api_key("snip_lifecycle").await.unwrap();
    let touched = storage
        .find_active_api_key("snip_lifecycle")
        .await
        .unwrap()
        .unwrap();
    assert!(touched.last_used_at.is_some());

    // Revocation is owner-scoped, like link deactivation.
    assert!(!storage.revoke_api_key(key.id, user.id + 1).await.unwrap());
    assert!(storage.revoke_api_key(key.id, user.id).await.unwrap());
    assert!(storage
        .find_active_api_key("snip_lifecycle")
        .await
        .unwrap()
        .is_none());

    // Revoked keys stay listed for their owner.
    let keys = storage.list_api_keys_by_user(user.id).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert!(!keys[0].is_active);
}

#[tokio::test]
async fn settings_upsert() {
    let storage = create_test_storage().await;

    assert_eq!(storage.get_setting("first_admin_created").await.unwrap(), None);

    storage
        .set_setting("first_admin_created", "true")
        .await
        .unwrap();
    assert_eq!(
        storage.get_setting("first_admin_created").await.unwrap(),
        Some("true".to_string())
    );

    storage
        .set_setting("first_admin_created", "false")
        .await
        .unwrap();
    assert_eq!(
        storage.get_setting("first_admin_created").await.unwrap(),
        Some("false".to_string())
    );
}

#[tokio::test]
async fn disk_backed_storage_is_shared_between_connections() {
    let db_file = tempfile::NamedTempFile::new().unwrap();
    let url = format!("sqlite://{}", db_file.path().display());

    let writer = SqliteStorage::new(&url, 1).await.unwrap();
    writer.init().await.unwrap();
    writer
        .insert_link("durable", "https://example.com", None, None)
        .await
        .unwrap();

    // A second pool over the same file sees the committed row.
    let reader = SqliteStorage::new(&url, 1).await.unwrap();
    let link = reader
        .find_link_by_code("durable")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.original_url, "https://example.com");
    assert!(link.is_active);
}

#[tokio::test]
async fn admin_stats_count_the_right_things() {
    let storage = create_test_storage().await;
    let user = storage
        .insert_user("stats", "stats@example.com", "hash", false)
        .await
        .unwrap();

    let owned = storage
        .insert_link("owned1", "https://example.com", Some(user.id), None)
        .await
        .unwrap();
    storage
        .insert_link("anon1", "https://example.com", None, None)
        .await
        .unwrap();
    let inactive = storage
        .insert_link("dead1", "https://example.com", Some(user.id), None)
        .await
        .unwrap();
    storage.deactivate_link(inactive.id, user.id).await.unwrap();

    storage
        .insert_click(owned.id, Some("1.1.1.1"), None, None, None, None)
        .await
        .unwrap();
    storage
        .insert_click(owned.id, Some("2.2.2.2"), None, None, None, None)
        .await
        .unwrap();

    let stats = storage.admin_stats().await.unwrap();
    assert_eq!(stats.total_users, 1);
    assert_eq!(stats.total_links, 3);
    assert_eq!(stats.total_clicks, 2);
    assert_eq!(stats.active_links, 2);
    assert_eq!(stats.links_with_analytics, 2);
}
