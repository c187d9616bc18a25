use std::sync::Arc;

use anyhow::Context;

use keystone_api::app::{AppServices, build_app};
use keystone_infra::{AppConfig, db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keystone_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = match config.database_url.clone() {
        Some(url) => {
            let pool = db::connect(&url)
                .await
                .context("failed to connect to the database")?;
            db::migrate(&pool)
                .await
                .context("failed to apply database schema")?;
            AppServices::postgres(config.clone(), pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores (data is not persisted)");
            AppServices::in_memory(config.clone())
        }
    };

    let app = build_app(Arc::new(services));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
