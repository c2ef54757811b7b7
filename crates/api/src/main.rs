use anyhow::Context;

use trove_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    trove_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = trove_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
