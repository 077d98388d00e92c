use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use handyhub_core::{Notification, PageRequest, StatusFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct NotificationListQuery {
    pub user_id: Uuid,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct NotificationPageData {
    pub items: Vec<Notification>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub(super) struct MarkReadData {
    pub id: Uuid,
    pub version: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct MarkAllReadData {
    pub updated: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct DeletedData {
    pub id: Uuid,
    pub deleted: bool,
}

pub(super) fn page_request(
    request_id: &str,
    query: &NotificationListQuery,
    default_limit: u32,
) -> Result<PageRequest, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("") => StatusFilter::All,
        Some(raw) => raw
            .parse::<StatusFilter>()
            .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?,
    };

    Ok(PageRequest {
        user_id: query.user_id,
        page: query.page.unwrap_or(1).max(1),
        limit: query
            .limit
            .unwrap_or(default_limit)
            .clamp(1, PageRequest::MAX_LIMIT),
        status,
    })
}

pub(super) async fn list_notifications(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<ApiResponse<NotificationPageData>>, ApiError> {
    let request = page_request(&req_id.0, &query, state.notifications_page_size)?;
    let page = handyhub_db::fetch_notification_page(&state.pool, &request)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: NotificationPageData {
            items: page.notifications,
            total: page.total,
            page: request.page,
            limit: request.limit,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn mark_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MarkReadData>>, ApiError> {
    let version = handyhub_db::mark_notification_read(&state.pool, id, Utc::now())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MarkReadData { id, version },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn mark_all_read(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<MarkAllReadData>>, ApiError> {
    let updated = handyhub_db::mark_all_notifications_read(&state.pool, query.user_id, Utc::now())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MarkAllReadData { updated },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn delete_notification(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedData>>, ApiError> {
    handyhub_db::delete_notification(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: DeletedData { id, deleted: true },
        meta: ResponseMeta::new(req_id.0),
    }))
}
