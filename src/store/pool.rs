use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const MAX_CONNECTIONS: u32 = 10;

/// Open the pool and bring the schema up to date.
#[tracing::instrument(skip(url), err)]
pub async fn connect(url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!(max_connections = MAX_CONNECTIONS, "connected to postgres");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("billing schema migrated");

    Ok(pool)
}
