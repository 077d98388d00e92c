//! `LISTEN/NOTIFY` change feed for the `notifications` table.
//!
//! The `notifications_publish_change` trigger sends `{kind, notification}`
//! JSON on [`NOTIFICATION_CHANNEL`] for every insert, update and delete.

use handyhub_core::RemoteEvent;
use handyhub_notify::{FeedSink, Subscription};
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

pub const NOTIFICATION_CHANNEL: &str = "notification_changes";

/// Decode one trigger payload.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if the payload is not a change event.
pub fn decode_feed_payload(payload: &str) -> Result<RemoteEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Subscribe to changes of one user's notifications.
///
/// A dedicated listener connection is opened before this returns, so events
/// committed afterwards are not missed. Payloads that fail to decode are
/// logged and skipped. Losing the listener connection ends the feed: events
/// sent while disconnected are gone, so the consumer has to refetch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the listener cannot connect or `LISTEN` fails.
pub async fn subscribe_notification_feed(
    pool: &PgPool,
    user_id: Uuid,
    capacity: usize,
) -> Result<Subscription, DbError> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(NOTIFICATION_CHANNEL).await?;
    tracing::info!(%user_id, channel = NOTIFICATION_CHANNEL, "listening for notification changes");

    Ok(Subscription::spawn(capacity, move |sink| {
        pump(listener, sink, user_id)
    }))
}

async fn pump(mut listener: PgListener, mut sink: FeedSink, user_id: Uuid) {
    loop {
        tokio::select! {
            () = sink.cancelled() => {
                tracing::debug!(%user_id, "notification feed unsubscribed");
                break;
            }
            received = listener.try_recv() => {
                let notification = match received {
                    Ok(Some(notification)) => notification,
                    Ok(None) => {
                        tracing::warn!(%user_id, "notification listener connection lost");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(%user_id, error = %e, "notification listener failed");
                        break;
                    }
                };

                let event = match decode_feed_payload(notification.payload()) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping undecodable notification payload");
                        continue;
                    }
                };
                if event.notification.user_id != user_id {
                    continue;
                }
                if !sink.send(event).await {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use handyhub_core::{NotificationKind, RemoteEventKind};

    use super::*;

    #[test]
    fn decodes_trigger_payload() {
        // row_to_json renders timestamptz with an explicit offset
        let payload = r#"{"kind":"update","notification":{"id":"6f1c1d7e-5a47-4f0e-9d5b-0d0a2b7c9b11","user_id":"2c5e3a1b-1111-4a4a-8b8b-222233334444","title":"Quote accepted","message":"Thandi accepted your quote","kind":"request","status":"read","related_id":null,"related_kind":"job","created_at":"2025-06-01T10:00:00.123456+00:00","read_at":"2025-06-01T10:05:00+00:00","version":2}}"#;

        let event = decode_feed_payload(payload).expect("decode");
        assert_eq!(event.kind, RemoteEventKind::Update);
        assert_eq!(event.notification.kind, NotificationKind::Request);
        assert_eq!(event.notification.version, 2);
        assert!(!event.notification.is_unread());
        assert!(event.notification.read_at.is_some());
    }

    #[test]
    fn delete_payload_decodes() {
        let payload = r#"{"kind":"delete","notification":{"id":"6f1c1d7e-5a47-4f0e-9d5b-0d0a2b7c9b11","user_id":"2c5e3a1b-1111-4a4a-8b8b-222233334444","title":"t","message":"m","kind":"promo","status":"unread","related_id":null,"related_kind":null,"created_at":"2025-06-01T10:00:00+02:00","read_at":null,"version":4}}"#;

        let event = decode_feed_payload(payload).expect("decode");
        assert_eq!(event.kind, RemoteEventKind::Delete);
        assert_eq!(event.notification.kind, NotificationKind::Other);
    }

    #[test]
    fn rejects_foreign_payload() {
        assert!(decode_feed_payload(r#"{"hello":"world"}"#).is_err());
    }
}
