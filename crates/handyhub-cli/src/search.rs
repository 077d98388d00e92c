use handyhub_core::AppConfig;
use handyhub_search::{
    resolve_origin, search_with_distance, DeviceLocation, OriginRequest, SearchHit, SearchQuery,
};
use sqlx::PgPool;

pub(crate) async fn run_search(
    pool: &PgPool,
    config: &AppConfig,
    text: &str,
    near: Option<&str>,
    here: bool,
    radius_km: f64,
) -> anyhow::Result<()> {
    let request = match (near, here) {
        (Some(raw), _) => OriginRequest::Manual(raw),
        (None, true) => OriginRequest::Device,
        (None, false) => OriginRequest::None,
    };
    let device = DeviceLocation::from_setting(config.device_location.as_deref());
    let origin = resolve_origin(request, &device)?;

    let query = SearchQuery::new(text, origin, radius_km);
    if query.text().is_empty() {
        println!("nothing to search for");
        return Ok(());
    }

    let candidates = handyhub_db::list_provider_candidates(pool, query.text()).await?;
    let hits = search_with_distance(&candidates, &query);
    tracing::debug!(
        candidates = candidates.len(),
        hits = hits.len(),
        radius_km = query.radius_km(),
        "provider search finished"
    );

    if hits.is_empty() {
        println!("no providers found");
        return Ok(());
    }
    for hit in &hits {
        println!("{}", format_hit(hit));
    }
    Ok(())
}

pub(crate) fn format_hit(hit: &SearchHit) -> String {
    let c = &hit.candidate;
    let verified = if c.is_verified { " ✓" } else { "" };
    let distance = hit
        .distance_km
        .map(|d| format!("  {d:.1} km"))
        .unwrap_or_default();
    format!(
        "{name}{verified}  [{skill}]  {rating:.1}★ ({reviews})  R{rate}/h{distance}",
        name = c.display_name,
        skill = c.skill,
        rating = c.rating,
        reviews = c.review_count,
        rate = c.rate_per_hour,
    )
}
