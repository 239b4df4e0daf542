use anyhow::Context;
use spotledger::datasource::build_sources;
use spotledger::{api, Config, PriceCacheService};
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let sources = build_sources(&config, client);
    tracing::info!(
        "Quote sources in order: {:?}, cache ttl {:?}",
        config.quote_sources,
        config.price_cache_ttl
    );
    let prices = PriceCacheService::with_ttl(sources, config.price_cache_ttl);

    let addr = SocketAddr::from((config.bind_addr, config.port));
    let app = api::create_router(api::AppState::new(config, prices));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
