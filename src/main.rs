use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eros_predictor::config::Config;
use eros_predictor::db::{MatchStore, PredictionStore};
use eros_predictor::predictor::Predictor;
use eros_predictor::server::{router, AppState};
use eros_predictor::tracker::PerformanceTracker;

/// Fixtures served per request
const PREDICTION_LIMIT: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eros_predictor=info,tower_http=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting eros-predictor");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Initialize database
    let match_store = Arc::new(MatchStore::new(&config.database_url).await?);
    let prediction_store = Arc::new(PredictionStore::new(&config.database_url).await?);
    info!("Database initialized ({} fixtures stored)", match_store.get_count().await?);

    let tracker = Arc::new(PerformanceTracker::new(
        prediction_store,
        config.tracker_config(),
    ));
    let predictor = Predictor::load(config.orchestrator_config(), match_store, tracker).await;

    let state = Arc::new(AppState {
        predictor,
        fetch_days: config.fetch_days,
        limit: PREDICTION_LIMIT,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    info!("Shutting down eros-predictor");
    Ok(())
}
