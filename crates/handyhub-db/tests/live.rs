//! Live integration tests for handyhub-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/handyhub-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use std::time::Duration;

use chrono::Utc;
use handyhub_core::{
    NotificationKind, NotificationStatus, PageRequest, ProviderSeed, RemoteEventKind,
    StatusFilter,
};
use handyhub_db::{
    delete_notification, fetch_notification_page, insert_notification, insert_profile,
    list_provider_candidates, mark_all_notifications_read, mark_notification_read,
    mark_user_notification_read, seed_providers, subscribe_notification_feed, DbError, NewNotification, PgNotificationStore,
};
use handyhub_notify::{NotificationCenter, NotificationStore};
use rust_decimal::Decimal;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed(name: &str, skill: &str, location: serde_json::Value) -> ProviderSeed {
    ProviderSeed {
        display_name: name.to_string(),
        skill: skill.to_string(),
        location: location.into(),
        rate_per_hour: Decimal::new(30000, 2),
        is_verified: false,
    }
}

fn new_notification(user_id: Uuid, title: &str) -> NewNotification {
    NewNotification {
        user_id,
        title: title.to_string(),
        message: format!("{title} details"),
        kind: NotificationKind::Message,
        related_id: None,
        related_kind: None,
    }
}

async fn insert_many(pool: &sqlx::PgPool, user_id: Uuid, titles: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for title in titles {
        let n = insert_notification(pool, &new_notification(user_id, title))
            .await
            .unwrap_or_else(|e| panic!("insert_notification failed for '{title}': {e}"));
        ids.push(n.id);
    }
    ids
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seeded_providers_are_listed_with_profile_names(pool: sqlx::PgPool) {
    let providers = vec![
        seed("Sipho Plumbing", "plumber", serde_json::json!({"lat": -29.8587, "lng": 31.0218})),
        seed("Durban Sparks", "electrician", serde_json::json!("-29.85, 31.02")),
        seed("No Fixed Address", "plumber", serde_json::Value::Null),
    ];
    assert_eq!(seed_providers(&pool, &providers).await.expect("seed"), 3);
    // idempotent
    assert_eq!(seed_providers(&pool, &providers).await.expect("reseed"), 3);

    let plumbers = list_provider_candidates(&pool, "PLUMB").await.expect("list");
    assert_eq!(plumbers.len(), 2);
    assert!(plumbers.iter().any(|c| c.display_name == "Sipho Plumbing"));
    assert!(plumbers
        .iter()
        .any(|c| c.raw_location == handyhub_core::LocationSpec::Absent));

    let all = list_provider_candidates(&pool, "  ").await.expect("list all");
    assert_eq!(all.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn provider_text_is_matched_literally(pool: sqlx::PgPool) {
    seed_providers(&pool, &[seed("Plumb_Co", "plumber", serde_json::Value::Null)])
        .await
        .expect("seed");

    assert_eq!(list_provider_candidates(&pool, "b_c").await.expect("list").len(), 1);
    assert!(list_provider_candidates(&pool, "%").await.expect("list").is_empty());
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn page_fetch_filters_and_counts(pool: sqlx::PgPool) {
    let user = insert_profile(&pool, "Thandi").await.expect("profile");
    let other = insert_profile(&pool, "Other").await.expect("profile");
    let ids = insert_many(&pool, user, &["one", "two", "three"]).await;
    insert_many(&pool, other, &["not mine"]).await;

    mark_notification_read(&pool, ids[0], Utc::now())
        .await
        .expect("mark read");

    let mut request = PageRequest::first_page(user, 2);
    let page = fetch_notification_page(&pool, &request).await.expect("page");
    assert_eq!(page.total, 3);
    assert_eq!(page.notifications.len(), 2);

    request.status = StatusFilter::Unread;
    let unread = fetch_notification_page(&pool, &request).await.expect("unread");
    assert_eq!(unread.total, 2);
    assert!(unread.notifications.iter().all(|n| n.is_unread()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn updates_bump_version(pool: sqlx::PgPool) {
    let user = insert_profile(&pool, "Thandi").await.expect("profile");
    let created = insert_notification(&pool, &new_notification(user, "hello"))
        .await
        .expect("insert");
    assert_eq!(created.version, 1);
    assert_eq!(created.status, NotificationStatus::Unread);

    let version = mark_notification_read(&pool, created.id, Utc::now())
        .await
        .expect("mark read");
    assert_eq!(version, 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_rows_are_not_found(pool: sqlx::PgPool) {
    let id = Uuid::new_v4();
    assert!(matches!(
        mark_notification_read(&pool, id, Utc::now()).await,
        Err(DbError::NotFound)
    ));
    assert!(matches!(delete_notification(&pool, id).await, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn user_scoped_mark_read_ignores_other_users(pool: sqlx::PgPool) {
    let user = insert_profile(&pool, "Thandi").await.expect("profile");
    let other = insert_profile(&pool, "Other").await.expect("profile");
    let mine = insert_many(&pool, user, &["mine"]).await;
    let theirs = insert_many(&pool, other, &["theirs"]).await;

    assert!(matches!(
        mark_user_notification_read(&pool, user, theirs[0], Utc::now()).await,
        Err(DbError::NotFound)
    ));
    let version = mark_user_notification_read(&pool, user, mine[0], Utc::now())
        .await
        .expect("mark read");
    assert_eq!(version, 2);

    let request = PageRequest {
        status: StatusFilter::Unread,
        ..PageRequest::first_page(other, 20)
    };
    assert_eq!(fetch_notification_page(&pool, &request).await.expect("page").total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_all_read_only_touches_one_user(pool: sqlx::PgPool) {
    let user = insert_profile(&pool, "Thandi").await.expect("profile");
    let other = insert_profile(&pool, "Other").await.expect("profile");
    insert_many(&pool, user, &["a", "b"]).await;
    insert_many(&pool, other, &["c"]).await;

    let changed = mark_all_notifications_read(&pool, user, Utc::now())
        .await
        .expect("mark all");
    assert_eq!(changed, 2);

    let request = PageRequest {
        status: StatusFilter::Unread,
        ..PageRequest::first_page(other, 20)
    };
    assert_eq!(fetch_notification_page(&pool, &request).await.expect("page").total, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn store_backs_notification_center(pool: sqlx::PgPool) {
    let user = insert_profile(&pool, "Thandi").await.expect("profile");
    let ids = insert_many(&pool, user, &["a", "b", "c"]).await;

    let store = PgNotificationStore::new(pool.clone());
    let center = NotificationCenter::new(store.clone(), PageRequest::first_page(user, 20));
    assert_eq!(center.refresh().await.expect("refresh"), 3);

    assert!(center.mark_read(ids[0]).await.expect("mark read"));
    let outcome = center.delete_many(&[ids[1], Uuid::new_v4()]).await;
    assert_eq!(outcome.confirmed, vec![ids[1]]);

    let page = store
        .fetch_page(&PageRequest::first_page(user, 20))
        .await
        .expect("page");
    assert_eq!(page.total, 2);
    assert_eq!(center.unread_count().await, 1);
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn feed_delivers_only_the_users_changes(pool: sqlx::PgPool) {
    let user = insert_profile(&pool, "Thandi").await.expect("profile");
    let other = insert_profile(&pool, "Other").await.expect("profile");
    let mut feed = subscribe_notification_feed(&pool, user, 8)
        .await
        .expect("subscribe");

    insert_many(&pool, other, &["not mine"]).await;
    let ids = insert_many(&pool, user, &["mine"]).await;
    delete_notification(&pool, ids[0]).await.expect("delete");

    let inserted = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .expect("insert event in time")
        .expect("feed open");
    assert_eq!(inserted.kind, RemoteEventKind::Insert);
    assert_eq!(inserted.notification.id, ids[0]);

    let deleted = tokio::time::timeout(Duration::from_secs(5), feed.next())
        .await
        .expect("delete event in time")
        .expect("feed open");
    assert_eq!(deleted.kind, RemoteEventKind::Delete);
    assert_eq!(deleted.notification.version, 1);

    feed.unsubscribe().await;
}
