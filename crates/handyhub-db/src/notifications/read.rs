//! Read operations for the `notifications` table.

use handyhub_core::{NotificationPage, PageRequest};
use sqlx::PgPool;

use super::types::NotificationRow;
use crate::DbError;

/// Fetch one page of a user's notifications, newest first, with the total
/// count for the same filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails or [`DbError::InvalidRow`] if a
/// stored row cannot be converted.
pub async fn fetch_notification_page(
    pool: &PgPool,
    request: &PageRequest,
) -> Result<NotificationPage, DbError> {
    let status = request.status.as_status().map(|s| s.to_string());
    let limit = i64::from(request.limit.clamp(1, PageRequest::MAX_LIMIT));

    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, user_id, title, message, kind, status, related_id, related_kind, \
                created_at, read_at, version \
         FROM notifications \
         WHERE user_id = $1 \
           AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC, id \
         LIMIT $3 OFFSET $4",
    )
    .bind(request.user_id)
    .bind(status.as_deref())
    .bind(limit)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications \
         WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(request.user_id)
    .bind(status.as_deref())
    .fetch_one(pool)
    .await?;

    let notifications = rows
        .into_iter()
        .map(NotificationRow::into_notification)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        user_id = %request.user_id,
        page = request.page,
        returned = notifications.len(),
        total,
        "fetched notification page"
    );
    Ok(NotificationPage {
        notifications,
        total,
    })
}
