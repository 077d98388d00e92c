//! Integration tests for `NotificationCenter` against an in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use handyhub_core::{
    Notification, NotificationKind, NotificationPage, NotificationStatus, PageRequest,
    RemoteEvent, RemoteEventKind,
};
use handyhub_notify::{
    ApplyOutcome, NotificationCenter, NotificationStore, NotifyError, Subscription,
};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("store unavailable for {0}")]
struct FakeError(Uuid);

#[derive(Default)]
struct FakeStore {
    rows: std::sync::Mutex<Vec<Notification>>,
    failing: HashSet<Uuid>,
    calls: std::sync::Mutex<Vec<String>>,
    hold: Arc<tokio::sync::Mutex<()>>,
}

impl FakeStore {
    fn with_rows(rows: Vec<Notification>) -> Self {
        Self {
            rows: std::sync::Mutex::new(rows),
            ..Self::default()
        }
    }

    fn failing_on(mut self, id: Uuid) -> Self {
        self.failing.insert(id);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl NotificationStore for FakeStore {
    type Error = FakeError;

    async fn fetch_page(&self, request: &PageRequest) -> Result<NotificationPage, FakeError> {
        self.record("fetch".to_string());
        let rows = self.rows.lock().expect("rows lock").clone();
        let total = i64::try_from(rows.len()).expect("row count fits");
        let limit = usize::try_from(request.limit).expect("limit fits");
        Ok(NotificationPage {
            notifications: rows.into_iter().take(limit).collect(),
            total,
        })
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> Result<i64, FakeError> {
        let _held = self.hold.lock().await;
        self.record(format!("read {id}"));
        if self.failing.contains(&id) {
            return Err(FakeError(id));
        }
        let mut rows = self.rows.lock().expect("rows lock");
        let row = rows.iter_mut().find(|r| r.id == id).ok_or(FakeError(id))?;
        row.status = NotificationStatus::Read;
        row.read_at = Some(read_at);
        row.version += 1;
        Ok(row.version)
    }

    async fn delete(&self, id: Uuid) -> Result<(), FakeError> {
        self.record(format!("delete {id}"));
        if self.failing.contains(&id) {
            return Err(FakeError(id));
        }
        self.rows.lock().expect("rows lock").retain(|r| r.id != id);
        Ok(())
    }
}

fn note(title: &str, minute: i64) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        title: title.to_string(),
        message: format!("{title} body"),
        kind: NotificationKind::Request,
        status: NotificationStatus::Unread,
        related_id: None,
        related_kind: None,
        created_at: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap() + Duration::minutes(minute),
        read_at: None,
        version: 1,
    }
}

fn rows() -> Vec<Notification> {
    vec![note("c", 3), note("b", 2), note("a", 1)]
}

fn request() -> PageRequest {
    PageRequest::first_page(Uuid::nil(), 20)
}

async fn titles<S: NotificationStore>(center: &NotificationCenter<S>) -> Vec<String> {
    center
        .snapshot()
        .await
        .into_iter()
        .map(|n| n.title)
        .collect()
}

#[tokio::test]
async fn refresh_loads_page_and_total() {
    let center = NotificationCenter::new(FakeStore::with_rows(rows()), request());
    let total = center.refresh().await.expect("refresh");

    assert_eq!(total, 3);
    assert_eq!(titles(&center).await, vec!["c", "b", "a"]);
    assert_eq!(center.unread_count().await, 3);
}

#[tokio::test]
async fn mark_read_confirms_with_store() {
    let data = rows();
    let id = data[1].id;
    let center = NotificationCenter::new(FakeStore::with_rows(data), request());
    center.refresh().await.expect("refresh");

    assert!(center.mark_read(id).await.expect("mark read"));
    assert_eq!(center.unread_count().await, 2);
}

#[tokio::test]
async fn mark_read_keeps_store_version_against_stale_echo() {
    let data = rows();
    let target = data[0].clone();
    let center = NotificationCenter::new(FakeStore::with_rows(data), request());
    center.refresh().await.expect("refresh");

    assert!(center.mark_read(target.id).await.expect("mark read"));
    assert_eq!(center.snapshot().await[0].version, 2);

    // a replayed pre-read row must not undo the confirmed read
    let outcome = center
        .apply_remote(RemoteEvent {
            kind: RemoteEventKind::Update,
            notification: target,
        })
        .await;
    assert_eq!(outcome, ApplyOutcome::Stale);
    assert_eq!(center.unread_count().await, 2);
}

#[tokio::test]
async fn mark_read_failure_rolls_back_and_reports() {
    let data = rows();
    let id = data[0].id;
    let center = NotificationCenter::new(FakeStore::with_rows(data).failing_on(id), request());
    center.refresh().await.expect("refresh");

    let err = center.mark_read(id).await.expect_err("should fail");
    assert!(matches!(err, NotifyError::ConfirmationFailure { .. }));
    assert_eq!(err.notification_id(), Some(id));
    assert!(err.to_string().contains("retry"));
    assert_eq!(center.unread_count().await, 3);
}

#[tokio::test]
async fn mark_read_unknown_id_does_not_touch_store() {
    let store = Arc::new(FakeStore::with_rows(rows()));
    let center = NotificationCenter::new(Arc::clone(&store), request());
    center.refresh().await.expect("refresh");

    assert!(!center.mark_read(Uuid::new_v4()).await.expect("no-op"));
    assert_eq!(center.snapshot().await.len(), 3);
    assert_eq!(store.calls(), vec!["fetch"]);
}

#[tokio::test]
async fn mark_all_read_reverts_only_failures() {
    let data = rows();
    let failing = data[2].id;
    let center = NotificationCenter::new(FakeStore::with_rows(data).failing_on(failing), request());
    center.refresh().await.expect("refresh");

    let outcome = center.mark_all_read().await;
    assert_eq!(outcome.confirmed.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert!(!outcome.is_complete());

    let unread: Vec<_> = center
        .snapshot()
        .await
        .into_iter()
        .filter(Notification::is_unread)
        .map(|n| n.id)
        .collect();
    assert_eq!(unread, vec![failing]);
}

#[tokio::test]
async fn delete_many_restores_failed_entry_in_place() {
    let mut data = rows();
    data.push(note("d", 0));
    let (c, b, a) = (data[0].id, data[1].id, data[2].id);
    let center = NotificationCenter::new(FakeStore::with_rows(data).failing_on(b), request());
    center.refresh().await.expect("refresh");

    let outcome = center.delete_many(&[a, b, c]).await;

    assert_eq!(outcome.confirmed.len(), 2);
    assert!(outcome.confirmed.contains(&a));
    assert!(outcome.confirmed.contains(&c));
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].notification_id(), Some(b));
    assert_eq!(titles(&center).await, vec!["b", "d"]);
}

#[tokio::test]
async fn remote_update_during_pending_read_wins_after_rollback() {
    let data = rows();
    let target = data[0].clone();
    let store = FakeStore::with_rows(data).failing_on(target.id);
    let hold = Arc::clone(&store.hold);
    let center = NotificationCenter::new(store, request());
    center.refresh().await.expect("refresh");

    let guard = hold.lock().await;
    let mut edited = target.clone();
    edited.version = 2;
    edited.title = "c (edited)".to_string();

    let center_ref = &center;
    let (result, shown_while_pending) = tokio::join!(center_ref.mark_read(target.id), async move {
        center_ref
            .apply_remote(RemoteEvent {
                kind: RemoteEventKind::Update,
                notification: edited,
            })
            .await;
        let shown = center_ref.snapshot().await;
        drop(guard);
        shown
    });

    // optimistic read still shown over the newer remote copy
    assert_eq!(shown_while_pending[0].title, "c (edited)");
    assert_eq!(shown_while_pending[0].status, NotificationStatus::Read);

    assert!(result.is_err());
    let after = center.snapshot().await;
    assert_eq!(after[0].title, "c (edited)");
    assert!(after[0].is_unread());
}

#[tokio::test]
async fn follow_applies_events_until_shutdown() {
    let center = NotificationCenter::new(FakeStore::default(), request());
    let (mut sink, subscription) = Subscription::channel(8);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let incoming = note("live", 10);

    let follow = center.follow(subscription, async move {
        let _ = stop_rx.await;
    });
    let drive = async {
        assert!(
            sink.send(RemoteEvent {
                kind: RemoteEventKind::Insert,
                notification: incoming.clone(),
            })
            .await
        );
        // let the follower drain the buffer before shutting down
        while center.snapshot().await.is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(center.is_live());
        let _ = stop_tx.send(());
    };

    let (result, ()) = tokio::join!(follow, drive);
    assert!(result.is_ok());
    assert!(!center.is_live());
    assert_eq!(titles(&center).await, vec!["live"]);
    sink.cancelled().await;
    assert!(sink.is_closed());
}

#[tokio::test]
async fn lost_feed_refetches_and_reports() {
    let center = NotificationCenter::new(FakeStore::with_rows(rows()), request());
    let subscription = Subscription::spawn(4, |_sink| async {});

    let err = center
        .follow(subscription, std::future::pending::<()>())
        .await
        .expect_err("feed should be lost");

    assert!(matches!(err, NotifyError::SubscriptionLost));
    assert!(!center.is_live());
    assert_eq!(center.snapshot().await.len(), 3);
}

#[tokio::test]
async fn changes_tick_on_view_updates() {
    let data = rows();
    let id = data[0].id;
    let center = NotificationCenter::new(FakeStore::with_rows(data), request());
    let mut changes = center.changes();

    center.refresh().await.expect("refresh");
    assert!(changes.has_changed().expect("sender alive"));
    changes.borrow_and_update();

    // nothing to do, nothing to announce
    assert!(!center.mark_read(Uuid::new_v4()).await.expect("no-op"));
    assert!(!changes.has_changed().expect("sender alive"));

    assert!(center.mark_read(id).await.expect("mark read"));
    assert!(*changes.borrow_and_update() >= 3);
}
