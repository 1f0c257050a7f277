//! Integration tests for the link resolver: creation, collision handling,
//! lookup and lifecycle.

use snip::links::{LinkResolver, ShortenError};
use snip::storage::{SqliteStorage, Storage};
use std::sync::Arc;

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn resolver() -> (Arc<dyn Storage>, LinkResolver) {
    let storage = create_test_storage().await;
    (Arc::clone(&storage), LinkResolver::new(storage))
}

#[tokio::test]
async fn created_code_round_trips_to_original_url() {
    let (_, resolver) = resolver().await;

    let link = resolver
        .create("https://example.com/page", None, None, None)
        .await
        .unwrap();

    assert_eq!(link.short_code.len(), 6);
    assert!(link.short_code.bytes().all(|b| b.is_ascii_alphanumeric()));
    assert!(link.is_active);
    assert_eq!(link.owner_id, None);
    assert!(!link.has_analytics());

    let found = resolver.lookup(&link.short_code).await.unwrap().unwrap();
    assert_eq!(found.original_url, "https://example.com/page");
    assert_eq!(found.id, link.id);
}

#[tokio::test]
async fn invalid_urls_are_rejected_with_no_side_effects() {
    let (storage, resolver) = resolver().await;

    for url in ["", "not a url", "example.com/missing-scheme", "/relative"] {
        let err = resolver.create(url, None, None, None).await.unwrap_err();
        assert!(matches!(err, ShortenError::InvalidUrl), "url: {url:?}");
    }

    // Absolute URIs without a host-carrying http(s) scheme parse fine but
    // must never be stored as redirect targets.
    for url in [
        "mailto:user@example.com",
        "data:text/plain,hello",
        "file:///etc/passwd",
        "javascript:alert(1)",
    ] {
        let err = resolver.create(url, None, None, None).await.unwrap_err();
        assert!(matches!(err, ShortenError::InvalidUrl), "url: {url:?}");
    }

    let oversized = format!("https://example.com/{}", "x".repeat(2048));
    let err = resolver.create(&oversized, None, None, None).await.unwrap_err();
    assert!(matches!(err, ShortenError::InvalidUrl));

    let stats = storage.admin_stats().await.unwrap();
    assert_eq!(stats.total_links, 0);
}

#[tokio::test]
async fn invalid_custom_codes_are_rejected() {
    let (_, resolver) = resolver().await;

    for code in ["", "has space", "slash/", "way-too-long-code"] {
        let err = resolver
            .create("https://example.com", None, Some(code), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenError::InvalidCode), "code: {code:?}");
    }
}

#[tokio::test]
async fn custom_code_collision_fails_without_creating_a_row() {
    let (storage, resolver) = resolver().await;

    resolver
        .create("https://example.com/first", None, Some("promo"), None)
        .await
        .unwrap();

    let err = resolver
        .create("https://example.com/second", None, Some("promo"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenError::CodeTaken));

    let stats = storage.admin_stats().await.unwrap();
    assert_eq!(stats.total_links, 1);
}

#[tokio::test]
async fn soft_deleted_code_is_never_reassigned() {
    let (storage, resolver) = resolver().await;
    let user = storage
        .insert_user("owner", "owner@example.com", "hash", false)
        .await
        .unwrap();

    let link = resolver
        .create("https://example.com", Some(user.id), Some("abc123"), None)
        .await
        .unwrap();
    assert!(resolver.deactivate(link.id, user.id).await.unwrap());
    assert!(resolver.lookup("abc123").await.unwrap().is_none());

    let err = resolver
        .create("https://example.com/again", None, Some("abc123"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShortenError::CodeTaken));
}

#[tokio::test]
async fn lookup_hides_inactive_links() {
    let (storage, resolver) = resolver().await;
    let user = storage
        .insert_user("hider", "hider@example.com", "hash", false)
        .await
        .unwrap();

    let link = resolver
        .create("https://example.com", Some(user.id), Some("vanish"), None)
        .await
        .unwrap();
    assert!(resolver.lookup("vanish").await.unwrap().is_some());

    resolver.deactivate(link.id, user.id).await.unwrap();

    // Soft-deleted and never-existed are the same answer.
    assert!(resolver.lookup("vanish").await.unwrap().is_none());
    assert!(resolver.lookup("never-was").await.unwrap().is_none());
}

#[tokio::test]
async fn deactivate_by_non_owner_is_refused() {
    let (storage, resolver) = resolver().await;
    let owner = storage
        .insert_user("owner", "owner@example.com", "hash", false)
        .await
        .unwrap();

    let link = resolver
        .create("https://example.com", Some(owner.id), None, None)
        .await
        .unwrap();

    assert!(!resolver.deactivate(link.id, owner.id + 1).await.unwrap());
    let stored = resolver.lookup(&link.short_code).await.unwrap();
    assert!(stored.is_some(), "link must remain active");
}

#[tokio::test]
async fn anonymous_links_cannot_be_deactivated_through_the_owner_path() {
    let (_, resolver) = resolver().await;

    let link = resolver
        .create("https://example.com", None, None, None)
        .await
        .unwrap();

    assert!(!resolver.deactivate(link.id, 1).await.unwrap());
    assert!(resolver.lookup(&link.short_code).await.unwrap().is_some());
}

#[tokio::test]
async fn expiry_is_derived_not_stored() {
    let (_, resolver) = resolver().await;
    let now = chrono::Utc::now().timestamp();

    let expired = resolver
        .create("https://example.com", None, Some("old"), Some(now - 3600))
        .await
        .unwrap();
    let fresh = resolver
        .create("https://example.com", None, Some("new"), Some(now + 3600))
        .await
        .unwrap();
    let eternal = resolver
        .create("https://example.com", None, Some("ever"), None)
        .await
        .unwrap();

    assert!(expired.is_expired(now));
    assert!(!fresh.is_expired(now));
    assert!(!eternal.is_expired(now));

    // Expired links are still active rows; only the redirect path refuses
    // them.
    let stored = resolver.lookup("old").await.unwrap().unwrap();
    assert!(stored.is_active);
}

#[tokio::test]
async fn random_generation_retries_past_collisions() {
    let (_, resolver) = resolver().await;

    // A healthy pile of random creations; every one must land on a distinct
    // free code.
    let mut codes = std::collections::HashSet::new();
    for i in 0..50 {
        let link = resolver
            .create(&format!("https://example.com/{i}"), None, None, None)
            .await
            .unwrap();
        assert!(codes.insert(link.short_code), "code issued twice");
    }
}
