use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sports_news::aggregator::{start_background_refresh, Aggregator};
use sports_news::cache::SystemClock;
use sports_news::config::Config;
use sports_news::fetcher::HttpFetcher;
use sports_news::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sports_news=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("SPORTS_NEWS_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Loaded {} feeds from {} (cache ttl {} min)",
        config.feeds.len(),
        config_path,
        config.cache.ttl_minutes
    );

    // Create aggregator
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let aggregator = Arc::new(Aggregator::from_config(
        &config,
        fetcher,
        Arc::new(SystemClock),
    ));

    // Start background refresh task
    let bg_aggregator = aggregator.clone();
    let refresh_interval = config.refresh_interval;
    tokio::spawn(async move {
        start_background_refresh(bg_aggregator, refresh_interval).await;
    });

    // Create app state
    let state = Arc::new(AppState {
        aggregator,
        development: config.server.development,
    });
    let app = routes::router(state);

    // Start server
    let addr = std::env::var("SPORTS_NEWS_ADDR").unwrap_or_else(|_| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server starting on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
