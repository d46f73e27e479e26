use std::env;

use anyhow::{Context, Result};

use crate::orchestrator::OrchestratorConfig;
use crate::tracker::TrackerConfig;

const DEFAULT_COMPETITIONS: &str = "PL,PD,BL1,SA,FL1,CL,EL,ECL,ELC,DED,PPL,BSA,CLI";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path
    pub database_url: String,

    pub football_data_api_key: String,
    pub football_data_base_url: String,

    /// RapidAPI key for API-Football
    pub api_football_key: String,
    pub api_football_base_url: String,

    /// HTTP server port
    pub port: u16,

    /// Minimum confidence for a medium-risk recommendation
    pub risk_threshold: f64,

    /// Trailing window for agent accuracy, in days
    pub tracker_window_days: i64,

    /// Resolved predictions an agent needs before its weight moves
    pub tracker_min_predictions: usize,

    /// Delay between provider requests in milliseconds (free tier: 10/min)
    pub api_delay_ms: u64,

    /// Days ahead to fetch and predict
    pub fetch_days: i64,

    /// football-data.org competition codes to fetch
    pub competitions: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/eros.db".to_string()),

            football_data_api_key: env::var("FOOTBALL_DATA_API_KEY").unwrap_or_default(),

            football_data_base_url: env::var("FOOTBALL_DATA_BASE_URL")
                .unwrap_or_else(|_| "https://api.football-data.org/v4".to_string()),

            api_football_key: env::var("API_FOOTBALL_KEY").unwrap_or_default(),

            api_football_base_url: env::var("API_FOOTBALL_BASE_URL")
                .unwrap_or_else(|_| "https://api-football-v1.p.rapidapi.com/v3".to_string()),

            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,

            risk_threshold: env::var("RISK_THRESHOLD")
                .unwrap_or_else(|_| "0.60".to_string())
                .parse()
                .context("RISK_THRESHOLD must be a valid number")?,

            tracker_window_days: env::var("TRACKER_WINDOW_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("TRACKER_WINDOW_DAYS must be a valid number")?,

            tracker_min_predictions: env::var("TRACKER_MIN_PREDICTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("TRACKER_MIN_PREDICTIONS must be a valid number")?,

            api_delay_ms: env::var("API_DELAY_MS")
                .unwrap_or_else(|_| "6500".to_string())
                .parse()
                .context("API_DELAY_MS must be a valid number")?,

            fetch_days: env::var("FETCH_DAYS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("FETCH_DAYS must be a valid number")?,

            competitions: parse_list(
                &env::var("COMPETITIONS").unwrap_or_else(|_| DEFAULT_COMPETITIONS.to_string()),
            ),
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            risk_threshold: self.risk_threshold,
        }
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            window_days: self.tracker_window_days,
            min_predictions: self.tracker_min_predictions,
            ..TrackerConfig::default()
        }
    }
}

/// Split a comma-separated list, dropping blanks
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
