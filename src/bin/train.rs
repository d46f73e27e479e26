use std::env;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eros_predictor::config::Config;
use eros_predictor::db::{MatchStore, PredictionStore};
use eros_predictor::tracker::PerformanceTracker;

const DEFAULT_LIMIT: i64 = 200;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "train=info,eros_predictor=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    let limit = parse_limit(&args);

    let config = Config::from_env()?;
    let match_store = MatchStore::new(&config.database_url).await?;
    let prediction_store = Arc::new(PredictionStore::new(&config.database_url).await?);
    let tracker = PerformanceTracker::new(prediction_store, config.tracker_config());

    // Resolve pending predictions against finished fixtures
    let finished = match_store.get_finished_matches(limit).await?;
    info!("Resolving {} finished fixtures", finished.len());

    let mut resolved = 0;
    for fixture in &finished {
        let Some((home, away)) = fixture.final_score() else {
            continue;
        };
        match tracker.log_result(&fixture.match_id_api, home, away).await {
            Some(_) => resolved += 1,
            None => warn!("Could not record result for {}", fixture.match_id_api),
        }
    }
    info!("{} results recorded", resolved);

    let summary = tracker.train_step().await;

    println!("Agent weights (max change {:.3}):", summary.max_change);
    for (agent, change) in &summary.changes {
        println!(
            "  {:<16} {:.3} -> {:.3} ({:+.3})",
            agent, change.old, change.new, change.delta
        );
    }
    if summary.saved {
        println!("New weights saved");
    } else {
        println!("Weights unchanged (below save threshold)");
    }

    Ok(())
}

/// Parse --limit argument
fn parse_limit(args: &[String]) -> i64 {
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
