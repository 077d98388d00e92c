use chrono::{DateTime, Utc};
use handyhub_core::{NotificationPage, PageRequest};
use handyhub_notify::NotificationStore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::notifications::{delete_notification, fetch_notification_page, mark_notification_read};
use crate::DbError;

/// [`NotificationStore`] backed by the `notifications` table.
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl NotificationStore for PgNotificationStore {
    type Error = DbError;

    async fn fetch_page(&self, request: &PageRequest) -> Result<NotificationPage, DbError> {
        fetch_notification_page(&self.pool, request).await
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> Result<i64, DbError> {
        mark_notification_read(&self.pool, id, read_at).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        delete_notification(&self.pool, id).await
    }
}
