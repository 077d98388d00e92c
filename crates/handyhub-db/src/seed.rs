use handyhub_core::ProviderSeed;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Create a bare profile and return its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_profile(pool: &PgPool, full_name: &str) -> Result<Uuid, DbError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO profiles (full_name) VALUES ($1) RETURNING id",
    )
    .bind(full_name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Upsert providers from a seed file, each with a linked profile.
///
/// Providers are keyed by `display_name` (stored as `business_name`). An
/// existing provider keeps its profile, whose name is refreshed.
///
/// Returns the number of providers processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_providers(pool: &PgPool, providers: &[ProviderSeed]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for provider in providers {
        let location = provider.location.to_json();
        let existing: Option<Option<Uuid>> = sqlx::query_scalar(
            "SELECT profile_id FROM service_providers WHERE business_name = $1",
        )
        .bind(&provider.display_name)
        .fetch_optional(&mut *tx)
        .await?;

        let profile_id = match existing.flatten() {
            Some(profile_id) => {
                sqlx::query(
                    "UPDATE profiles SET full_name = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(profile_id)
                .bind(&provider.display_name)
                .execute(&mut *tx)
                .await?;
                profile_id
            }
            None => {
                sqlx::query_scalar::<_, Uuid>(
                    "INSERT INTO profiles (full_name) VALUES ($1) RETURNING id",
                )
                .bind(&provider.display_name)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        sqlx::query(
            "INSERT INTO service_providers \
                 (profile_id, business_name, skill, location, rate_per_hour, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (business_name) DO UPDATE SET \
                 profile_id = EXCLUDED.profile_id, \
                 skill = EXCLUDED.skill, \
                 location = EXCLUDED.location, \
                 rate_per_hour = EXCLUDED.rate_per_hour, \
                 is_verified = EXCLUDED.is_verified, \
                 is_active = TRUE, \
                 updated_at = NOW()",
        )
        .bind(profile_id)
        .bind(&provider.display_name)
        .bind(&provider.skill)
        .bind(if location.is_null() { None } else { Some(location) })
        .bind(provider.rate_per_hour)
        .bind(provider.is_verified)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    tracing::info!(count, "seeded service providers");
    Ok(count)
}
