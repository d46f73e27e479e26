use std::env;
use std::time::Duration;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eros_predictor::api::{ApiFootballClient, FootballDataClient};
use eros_predictor::config::Config;
use eros_predictor::db::MatchStore;
use eros_predictor::models::Fixture;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetch_matches=info,eros_predictor=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Parse arguments
    let args: Vec<String> = env::args().collect();
    let days = parse_days(&args).unwrap_or(config.fetch_days).max(1);

    let today = Utc::now().date_naive();
    let until = today + ChronoDuration::days(days - 1);
    info!(
        "Fetching fixtures from {} to {} for {} competitions",
        today,
        until,
        config.competitions.len()
    );

    let store = MatchStore::new(&config.database_url).await?;
    let existing_count = store.get_count().await?;
    info!("Found {} existing fixtures in database", existing_count);

    let delay = Duration::from_millis(config.api_delay_ms);
    let mut stored = 0;
    let mut failed = 0;

    if config.football_data_api_key.is_empty() {
        warn!("FOOTBALL_DATA_API_KEY is not set, skipping football-data.org");
    } else {
        let client = FootballDataClient::new(
            &config.football_data_base_url,
            &config.football_data_api_key,
        )?;

        for (i, code) in config.competitions.iter().enumerate() {
            if i > 0 {
                // Rate limit
                sleep(delay).await;
            }

            match client.get_competition_matches(code, today, until).await {
                Ok(matches) => {
                    let fixtures: Vec<Fixture> =
                        matches.iter().filter_map(|m| m.to_fixture()).collect();
                    let (ok, err) = store_all(&store, &fixtures).await;
                    stored += ok;
                    failed += err;
                    info!(
                        "[{}/{}] {}: {} fixtures",
                        i + 1,
                        config.competitions.len(),
                        code,
                        fixtures.len()
                    );
                }
                Err(e) => {
                    error!("Failed to fetch competition {}: {:#}", code, e);
                    failed += 1;
                }
            }
        }

        sleep(delay).await;
        match client.get_live_matches().await {
            Ok(matches) => {
                let fixtures: Vec<Fixture> =
                    matches.iter().filter_map(|m| m.to_fixture()).collect();
                info!("{} live matches", fixtures.len());
                let (ok, err) = store_all(&store, &fixtures).await;
                stored += ok;
                failed += err;
            }
            Err(e) => error!("Failed to fetch live matches: {:#}", e),
        }
    }

    if !config.api_football_key.is_empty() {
        let client = ApiFootballClient::new(&config.api_football_base_url, &config.api_football_key)?;

        for date in dates(today, days) {
            sleep(delay).await;
            match client.get_fixtures_by_date(date).await {
                Ok(entries) => {
                    let fixtures: Vec<Fixture> = entries.iter().map(|e| e.to_fixture()).collect();
                    info!("API-Football {}: {} fixtures", date, fixtures.len());
                    let (ok, err) = store_all(&store, &fixtures).await;
                    stored += ok;
                    failed += err;
                }
                Err(e) => {
                    error!("Failed to fetch API-Football fixtures for {}: {:#}", date, e);
                    failed += 1;
                }
            }
        }
    }

    let final_count = store.get_count().await?;
    info!("Completed! Total fixtures in database: {}", final_count);
    info!("Session: {} stored, {} failed", stored, failed);

    Ok(())
}

/// Parse --days argument
fn parse_days(args: &[String]) -> Option<i64> {
    for (i, arg) in args.iter().enumerate() {
        if arg == "--days" || arg == "-d" {
            if let Some(value) = args.get(i + 1) {
                if let Ok(days) = value.parse() {
                    return Some(days);
                }
            }
        }
    }
    None
}

fn dates(start: NaiveDate, days: i64) -> impl Iterator<Item = NaiveDate> {
    (0..days).map(move |offset| start + ChronoDuration::days(offset))
}

/// Upsert fixtures, returning (stored, failed)
async fn store_all(store: &MatchStore, fixtures: &[Fixture]) -> (usize, usize) {
    let mut stored = 0;
    let mut failed = 0;

    for fixture in fixtures {
        match store.upsert_match(fixture).await {
            Ok(()) => stored += 1,
            Err(e) => {
                warn!("Failed to store {}: {:#}", fixture.match_id_api, e);
                failed += 1;
            }
        }
    }

    (stored, failed)
}
