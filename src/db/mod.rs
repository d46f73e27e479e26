pub mod matches;
pub mod predictions;

pub use matches::MatchStore;
pub use predictions::PredictionStore;

use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tracing::warn;

/// Open a SQLite pool, creating the file and its directory if needed
pub async fn connect(database_url: &str) -> Result<Pool<Sqlite>> {
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        let path = path.trim_start_matches("//");
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)
        .context("Invalid database URL")?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")
}

/// Fixed-width UTC text, so stored timestamps sort and compare as strings
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Like `parse_timestamp`, naming the column on failure
pub(crate) fn require_timestamp(s: &str, column: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(s).with_context(|| format!("Invalid {} timestamp {:?}", column, s))
}

/// Convert rows, dropping (and logging) those that fail to convert
pub(crate) fn convert_rows<R, T>(rows: Vec<R>) -> Vec<T>
where
    T: TryFrom<R, Error = anyhow::Error>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping unreadable row: {:#}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn temp_database_url(dir: &tempfile::TempDir) -> String {
    format!("sqlite:{}", dir.path().join("eros.db").display())
}
