//! Text + radius filtering and ranking of provider candidates.

use std::cmp::Ordering;

use handyhub_core::{Coordinate, ProviderCandidate};
use serde::Serialize;

use crate::{coordinate::parse_coordinate, distance::distance_km};

/// A search request as issued by the UI on each keystroke.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    text: String,
    origin: Option<Coordinate>,
    radius_km: f64,
}

impl SearchQuery {
    pub const MIN_RADIUS_KM: f64 = 1.0;
    pub const MAX_RADIUS_KM: f64 = 10.0;
    pub const DEFAULT_RADIUS_KM: f64 = 5.0;

    /// Build a query. Text is trimmed; the radius is clamped into
    /// `[MIN_RADIUS_KM, MAX_RADIUS_KM]` and a non-finite radius falls back to
    /// [`Self::DEFAULT_RADIUS_KM`].
    #[must_use]
    pub fn new(text: impl Into<String>, origin: Option<Coordinate>, radius_km: f64) -> Self {
        let radius_km = if radius_km.is_finite() {
            radius_km.clamp(Self::MIN_RADIUS_KM, Self::MAX_RADIUS_KM)
        } else {
            Self::DEFAULT_RADIUS_KM
        };
        Self {
            text: text.into().trim().to_string(),
            origin,
            radius_km,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn origin(&self) -> Option<Coordinate> {
        self.origin
    }

    #[must_use]
    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }
}

/// A matching candidate and, when the query had an origin, its distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub candidate: ProviderCandidate,
    pub distance_km: Option<f64>,
}

/// Filter and rank candidates for `query`.
///
/// Empty query text returns nothing. See [`search_with_distance`].
#[must_use]
pub fn search(candidates: &[ProviderCandidate], query: &SearchQuery) -> Vec<ProviderCandidate> {
    search_with_distance(candidates, query)
        .into_iter()
        .map(|hit| hit.candidate)
        .collect()
}

/// Filter and rank candidates, keeping the computed distance.
///
/// 1. empty text ⇒ `[]`
/// 2. case-insensitive substring match on `skill` or `display_name`
/// 3. with an origin: drop candidates whose location does not parse, keep
///    those within `radius_km`
/// 4. order by rating desc, review count desc, id asc
#[must_use]
pub fn search_with_distance(
    candidates: &[ProviderCandidate],
    query: &SearchQuery,
) -> Vec<SearchHit> {
    if query.text.is_empty() {
        return Vec::new();
    }

    let needle = query.text.to_lowercase();
    let mut hits: Vec<SearchHit> = candidates
        .iter()
        .filter(|c| {
            c.skill.to_lowercase().contains(&needle)
                || c.display_name.to_lowercase().contains(&needle)
        })
        .filter_map(|c| match query.origin {
            None => Some(SearchHit {
                candidate: c.clone(),
                distance_km: None,
            }),
            Some(origin) => {
                let position = parse_coordinate(&c.raw_location)?;
                let d = distance_km(origin, position);
                (d <= query.radius_km).then(|| SearchHit {
                    candidate: c.clone(),
                    distance_km: Some(d),
                })
            }
        })
        .collect();

    hits.sort_by(|a, b| rank(&a.candidate, &b.candidate));

    tracing::debug!(
        query = %query.text,
        radius_km = query.radius_km,
        has_origin = query.origin.is_some(),
        candidates = candidates.len(),
        hits = hits.len(),
        "provider search"
    );

    hits
}

fn rank(a: &ProviderCandidate, b: &ProviderCandidate) -> Ordering {
    b.rating
        .total_cmp(&a.rating)
        .then_with(|| b.review_count.cmp(&a.review_count))
        .then_with(|| a.id.cmp(&b.id))
}
