//! Connection pool and schema setup.

use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub use sqlx::PgPool;

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Apply the embedded schema. Safe to run repeatedly.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(INIT_SQL).execute(pool).await?;
    info!("database schema is up to date");
    Ok(())
}
