use std::path::Path;

use anyhow::Context;
use sqlx::PgPool;

pub(crate) async fn run_ping(pool: &PgPool) -> anyhow::Result<()> {
    handyhub_db::health_check(pool).await?;
    println!("database reachable");
    Ok(())
}

pub(crate) async fn run_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = handyhub_db::run_migrations(pool).await?;
    println!("migrations up to date ({applied} applied)");
    Ok(())
}

pub(crate) async fn run_seed(pool: &PgPool, file: &Path) -> anyhow::Result<()> {
    let seed = handyhub_core::load_provider_seed(file)
        .with_context(|| format!("loading provider seed from {}", file.display()))?;
    let count = handyhub_db::seed_providers(pool, &seed.providers).await?;
    tracing::info!(count, file = %file.display(), "seeded providers");
    println!("seeded {count} providers");
    Ok(())
}
