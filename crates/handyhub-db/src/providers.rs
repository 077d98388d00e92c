//! Provider candidates for proximity search.
//!
//! The provider's profile is a to-one relation fetched as JSON. It is
//! normalised with [`OneOrMany`] here so nothing above this layer ever sees
//! the array-or-object ambiguity.

use handyhub_core::{LocationSpec, OneOrMany, ProviderCandidate};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileRelation {
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderCandidateRow {
    pub id: Uuid,
    pub business_name: String,
    pub skill: String,
    pub location: Option<serde_json::Value>,
    pub rating: f64,
    pub review_count: i64,
    pub rate_per_hour: Decimal,
    pub is_verified: bool,
    pub profile: Option<Json<OneOrMany<ProfileRelation>>>,
}

impl ProviderCandidateRow {
    /// The linked profile, whichever shape the join produced.
    #[must_use]
    pub fn profile(&self) -> Option<ProfileRelation> {
        self.profile
            .as_ref()
            .and_then(|Json(relation)| relation.clone().into_single())
    }

    /// Display name comes from the profile when it has one.
    #[must_use]
    pub fn into_candidate(self) -> ProviderCandidate {
        let display_name = self
            .profile()
            .map(|p| p.full_name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.business_name.clone());

        ProviderCandidate {
            id: self.id,
            display_name,
            skill: self.skill,
            raw_location: LocationSpec::from(self.location),
            rating: self.rating,
            review_count: self.review_count,
            rate_per_hour: self.rate_per_hour,
            is_verified: self.is_verified,
        }
    }
}

/// Escape `%`, `_` and `\` so user text matches literally inside `ILIKE`.
fn like_pattern(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// List active providers whose skill, business name or profile name contains
/// `text`. Empty text lists every active provider.
///
/// This is a coarse prefilter; ranking and radius filtering happen in search.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_provider_candidates(
    pool: &PgPool,
    text: &str,
) -> Result<Vec<ProviderCandidate>, DbError> {
    let text = text.trim();
    let pattern = like_pattern(text);

    let rows = sqlx::query_as::<_, ProviderCandidateRow>(
        "SELECT sp.id, sp.business_name, sp.skill, sp.location, sp.rating, \
                sp.review_count, sp.rate_per_hour, sp.is_verified, \
                (SELECT jsonb_agg(jsonb_build_object('full_name', p.full_name, \
                                                     'avatar_url', p.avatar_url)) \
                 FROM profiles p WHERE p.id = sp.profile_id) AS profile \
         FROM service_providers sp \
         WHERE sp.is_active = TRUE \
           AND ($1 = '' \
                OR sp.skill ILIKE $2 \
                OR sp.business_name ILIKE $2 \
                OR EXISTS (SELECT 1 FROM profiles p \
                           WHERE p.id = sp.profile_id AND p.full_name ILIKE $2)) \
         ORDER BY sp.rating DESC, sp.review_count DESC, sp.id",
    )
    .bind(text)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    tracing::debug!(text, candidates = rows.len(), "listed provider candidates");
    Ok(rows
        .into_iter()
        .map(ProviderCandidateRow::into_candidate)
        .collect())
}
