//! Write operations for the `notifications` table.
//!
//! Every write fires the `notification_changes` trigger, so these functions
//! never publish feed events themselves.

use chrono::{DateTime, Utc};
use handyhub_core::Notification;
use sqlx::PgPool;
use uuid::Uuid;

use super::types::{NewNotification, NotificationRow};
use crate::DbError;

/// Insert a notification and return it as stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_notification(
    pool: &PgPool,
    new: &NewNotification,
) -> Result<Notification, DbError> {
    let row = sqlx::query_as::<_, NotificationRow>(
        "INSERT INTO notifications (user_id, title, message, kind, related_id, related_kind) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, user_id, title, message, kind, status, related_id, related_kind, \
                   created_at, read_at, version",
    )
    .bind(new.user_id)
    .bind(&new.title)
    .bind(&new.message)
    .bind(new.kind.to_string())
    .bind(new.related_id)
    .bind(new.related_kind.as_deref())
    .fetch_one(pool)
    .await?;

    row.into_notification()
}

/// Mark one notification read. Already-read rows keep their original
/// `read_at`.
///
/// Returns the new row version.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no notification has this id.
pub async fn mark_notification_read(
    pool: &PgPool,
    id: Uuid,
    read_at: DateTime<Utc>,
) -> Result<i64, DbError> {
    sqlx::query_scalar::<_, i64>(
        "UPDATE notifications \
         SET status = 'read', read_at = COALESCE(read_at, $2) \
         WHERE id = $1 \
         RETURNING version",
    )
    .bind(id)
    .bind(read_at)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Mark one of `user_id`'s notifications read, returning the new row version.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the id does not exist or belongs to
/// another user.
pub async fn mark_user_notification_read(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    read_at: DateTime<Utc>,
) -> Result<i64, DbError> {
    sqlx::query_scalar::<_, i64>(
        "UPDATE notifications \
         SET status = 'read', read_at = COALESCE(read_at, $3) \
         WHERE id = $1 AND user_id = $2 \
         RETURNING version",
    )
    .bind(id)
    .bind(user_id)
    .bind(read_at)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Mark every unread notification of a user read. Returns how many changed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_all_notifications_read(
    pool: &PgPool,
    user_id: Uuid,
    read_at: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE notifications \
         SET status = 'read', read_at = $2 \
         WHERE user_id = $1 AND status = 'unread'",
    )
    .bind(user_id)
    .bind(read_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no notification has this id.
pub async fn delete_notification(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
