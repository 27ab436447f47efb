use std::sync::Arc;

use anyhow::Context;

use catalog_api::app::{self, services};
use catalog_infra::CatalogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_observability::init();

    let config = CatalogConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(
        services::build_services(&config)
            .await
            .context("failed to initialize catalog store")?,
    );

    if config.seed_on_startup {
        services::spawn_seed_import(&services, &config).context("failed to start seed import")?;
    } else {
        tracing::info!("SEED_ON_STARTUP disabled; skipping seed import");
    }

    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
