//! Row types for the `notifications` table.

use chrono::{DateTime, Utc};
use handyhub_core::{Notification, NotificationKind, NotificationStatus};
use uuid::Uuid;

use crate::DbError;

/// Input record for inserting a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
    pub related_kind: Option<String>,
}

/// A row from the `notifications` table. `kind` and `status` stay as text
/// until converted with [`NotificationRow::into_notification`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub status: String,
    pub related_id: Option<Uuid>,
    pub related_kind: Option<String>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl NotificationRow {
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if `status` is not a known value.
    pub fn into_notification(self) -> Result<Notification, DbError> {
        let status = self
            .status
            .parse::<NotificationStatus>()
            .map_err(|e| DbError::InvalidRow {
                table: "notifications",
                id: self.id,
                reason: e.to_string(),
            })?;

        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            kind: NotificationKind::from(self.kind.as_str()),
            status,
            related_id: self.related_id,
            related_kind: self.related_kind,
            created_at: self.created_at,
            read_at: self.read_at,
            version: self.version,
        })
    }
}
