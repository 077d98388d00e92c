use axum::{
    extract::{Query, State},
    Extension, Json,
};
use handyhub_core::Coordinate;
use handyhub_search::{
    resolve_origin, search_with_distance, DeviceLocation, OriginRequest, SearchHit, SearchQuery,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ProviderSearchQuery {
    #[serde(default)]
    pub q: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Free-form origin such as `"-29.85,31.02"`; ignored when `lat`/`lng` are given.
    pub near: Option<String>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProviderSearchItem {
    pub id: Uuid,
    pub display_name: String,
    pub skill: String,
    pub rating: f64,
    pub review_count: i64,
    pub rate_per_hour: Decimal,
    pub is_verified: bool,
    pub distance_km: Option<f64>,
}

impl From<SearchHit> for ProviderSearchItem {
    fn from(hit: SearchHit) -> Self {
        let c = hit.candidate;
        Self {
            id: c.id,
            display_name: c.display_name,
            skill: c.skill,
            rating: c.rating,
            review_count: c.review_count,
            rate_per_hour: c.rate_per_hour,
            is_verified: c.is_verified,
            distance_km: hit.distance_km,
        }
    }
}

/// Pick the search origin from explicit coordinates or the `near` text.
pub(super) fn origin_from_query(
    request_id: &str,
    query: &ProviderSearchQuery,
) -> Result<Option<Coordinate>, ApiError> {
    match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Coordinate::new(lat, lng)
            .map(Some)
            .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string())),
        (Some(_), None) | (None, Some(_)) => Err(ApiError::new(
            request_id,
            "validation_error",
            "lat and lng must be given together",
        )),
        (None, None) => {
            let request = match query.near.as_deref().map(str::trim) {
                Some(near) if !near.is_empty() => OriginRequest::Manual(near),
                _ => OriginRequest::None,
            };
            // the server never has a device position of its own
            resolve_origin(request, &DeviceLocation::Unsupported)
                .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))
        }
    }
}

pub(super) async fn search_providers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProviderSearchQuery>,
) -> Result<Json<ApiResponse<Vec<ProviderSearchItem>>>, ApiError> {
    let origin = origin_from_query(&req_id.0, &query)?;
    let search_query = SearchQuery::new(
        query.q.as_str(),
        origin,
        query.radius_km.unwrap_or(state.search_default_radius_km),
    );

    let data = if search_query.text().is_empty() {
        Vec::new()
    } else {
        let candidates = handyhub_db::list_provider_candidates(&state.pool, search_query.text())
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        search_with_distance(&candidates, &search_query)
            .into_iter()
            .map(ProviderSearchItem::from)
            .collect()
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
