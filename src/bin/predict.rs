use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eros_predictor::config::Config;
use eros_predictor::db::{MatchStore, PredictionStore};
use eros_predictor::predictor::{render_prediction, render_summary, Predictor};
use eros_predictor::tracker::PerformanceTracker;

const DEFAULT_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predict=info,eros_predictor=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    let limit = parse_limit(&args);

    let config = Config::from_env()?;
    let match_store = Arc::new(MatchStore::new(&config.database_url).await?);
    let prediction_store = Arc::new(PredictionStore::new(&config.database_url).await?);

    let tracker = Arc::new(PerformanceTracker::new(
        prediction_store,
        config.tracker_config(),
    ));
    let predictor = Predictor::load(config.orchestrator_config(), match_store, tracker).await;

    info!("Predicting up to {} fixtures over {} days", limit, config.fetch_days);
    let predictions = predictor.predict_upcoming(config.fetch_days, limit).await;

    for prediction in &predictions {
        println!("{}\n", render_prediction(prediction));
    }
    println!("{}", render_summary(&predictions));

    Ok(())
}

/// Parse --limit argument
fn parse_limit(args: &[String]) -> usize {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--limit" || arg == "-l" {
            if let Some(value) = args.get(i + 1) {
                if let Ok(limit) = value.parse() {
                    return limit;
                }
            }
        }
    }
    DEFAULT_LIMIT
}
