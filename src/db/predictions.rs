use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use super::{connect, convert_rows, format_timestamp, parse_timestamp, require_timestamp};
use crate::models::{LogStatus, MatchResult, PredictionLog, PredictionSummary};
use crate::tracker::PerformanceStore;

const WEIGHTS_VERSION: &str = "1.0";

/// SQLite store for predictions, their logs, real results and agent weights
pub struct PredictionStore {
    pool: Pool<Sqlite>,
}

impl PredictionStore {
    /// Create a new prediction store and initialize the database
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = connect(database_url).await?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Prediction store initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id TEXT NOT NULL,
                fixture TEXT NOT NULL,
                league TEXT NOT NULL,
                best_market TEXT NOT NULL,
                final_prediction TEXT NOT NULL,
                final_confidence REAL NOT NULL,
                risk_level TEXT NOT NULL,
                status TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create predictions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prediction_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id TEXT NOT NULL,
                agent_name TEXT NOT NULL,
                market_type TEXT NOT NULL,
                predicted_outcome TEXT NOT NULL,
                confidence REAL NOT NULL,
                predicted_at TEXT NOT NULL,
                status TEXT NOT NULL,
                is_correct BOOLEAN,
                actual_outcome TEXT,
                resolved_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create prediction_logs table")?;

        // One log per match, agent and market
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_logs_key
            ON prediction_logs (match_id, agent_name, market_type)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_logs_match
            ON prediction_logs (match_id, status)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_logs_agent
            ON prediction_logs (agent_name, market_type, status, predicted_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS match_results (
                match_id TEXT PRIMARY KEY,
                actual_outcome_1n2 TEXT NOT NULL,
                home_score INTEGER NOT NULL,
                away_score INTEGER NOT NULL,
                total_goals INTEGER NOT NULL,
                resolved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create match_results table")?;

        // Single row, id 1
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ai_weights (
                id INTEGER PRIMARY KEY,
                weights TEXT NOT NULL,
                version TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create ai_weights table")?;

        Ok(())
    }

    /// Most recently stored predictions
    pub async fn get_recent_predictions(&self, limit: i64) -> Result<Vec<PredictionSummary>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT payload FROM predictions
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch predictions")?;

        rows.into_iter()
            .map(|(payload,)| {
                serde_json::from_str(&payload).context("Failed to parse stored prediction")
            })
            .collect()
    }

    pub async fn get_match_result(&self, match_id: &str) -> Result<Option<MatchResult>> {
        let row = sqlx::query_as::<_, MatchResultRow>(
            "SELECT * FROM match_results WHERE match_id = ?",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch match result")?;

        Ok(row.and_then(|r| convert_rows(vec![r]).pop()))
    }
}

#[async_trait]
impl PerformanceStore for PredictionStore {
    async fn upsert_prediction_log(&self, log: &PredictionLog) -> Result<i64> {
        sqlx::query(
            r#"
            INSERT INTO prediction_logs (
                match_id,
                agent_name,
                market_type,
                predicted_outcome,
                confidence,
                predicted_at,
                status,
                is_correct,
                actual_outcome,
                resolved_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id, agent_name, market_type) DO UPDATE SET
                predicted_outcome = excluded.predicted_outcome,
                confidence = excluded.confidence,
                predicted_at = excluded.predicted_at
            WHERE prediction_logs.status = 'pending'
            "#,
        )
        .bind(&log.match_id)
        .bind(&log.agent_name)
        .bind(&log.market_type)
        .bind(&log.predicted_outcome)
        .bind(log.confidence)
        .bind(format_timestamp(&log.predicted_at))
        .bind(log.status.as_str())
        .bind(log.is_correct)
        .bind(&log.actual_outcome)
        .bind(log.resolved_at.as_ref().map(format_timestamp))
        .execute(&self.pool)
        .await
        .context("Failed to upsert prediction log")?;

        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT id FROM prediction_logs
            WHERE match_id = ? AND agent_name = ? AND market_type = ?
            "#,
        )
        .bind(&log.match_id)
        .bind(&log.agent_name)
        .bind(&log.market_type)
        .fetch_one(&self.pool)
        .await
        .context("Failed to fetch prediction log id")?;

        Ok(row.0)
    }

    async fn pending_predictions(&self, match_id: &str) -> Result<Vec<PredictionLog>> {
        let rows = sqlx::query_as::<_, PredictionLogRow>(
            r#"
            SELECT * FROM prediction_logs
            WHERE match_id = ? AND status = 'pending'
            ORDER BY id ASC
            "#,
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch pending predictions")?;

        Ok(convert_rows(rows))
    }

    async fn resolve_prediction(
        &self,
        id: i64,
        is_correct: bool,
        actual_outcome: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE prediction_logs
            SET status = 'resolved', is_correct = ?, actual_outcome = ?, resolved_at = ?
            WHERE id = ?
            "#,
        )
        .bind(is_correct)
        .bind(actual_outcome)
        .bind(format_timestamp(&resolved_at))
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to resolve prediction {}", id))?;

        Ok(())
    }

    async fn upsert_match_result(&self, result: &MatchResult) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO match_results (
                match_id,
                actual_outcome_1n2,
                home_score,
                away_score,
                total_goals,
                resolved_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id) DO UPDATE SET
                actual_outcome_1n2 = excluded.actual_outcome_1n2,
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                total_goals = excluded.total_goals,
                resolved_at = excluded.resolved_at
            "#,
        )
        .bind(&result.match_id)
        .bind(&result.actual_outcome_1n2)
        .bind(result.home_score)
        .bind(result.away_score)
        .bind(result.total_goals)
        .bind(format_timestamp(&result.resolved_at))
        .execute(&self.pool)
        .await
        .context("Failed to upsert match result")?;

        Ok(())
    }

    async fn resolved_predictions(
        &self,
        agent_name: &str,
        market_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PredictionLog>> {
        let rows = sqlx::query_as::<_, PredictionLogRow>(
            r#"
            SELECT * FROM prediction_logs
            WHERE agent_name = ?
              AND market_type = ?
              AND status = 'resolved'
              AND predicted_at >= ?
            ORDER BY predicted_at DESC
            "#,
        )
        .bind(agent_name)
        .bind(market_type)
        .bind(format_timestamp(&since))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch resolved predictions")?;

        Ok(convert_rows(rows))
    }

    async fn load_agent_weights(&self) -> Result<Option<BTreeMap<String, f64>>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT weights FROM ai_weights WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to load agent weights")?;

        match row {
            Some((json,)) => {
                let weights = serde_json::from_str(&json).context("Invalid stored weights")?;
                Ok(Some(weights))
            }
            None => Ok(None),
        }
    }

    async fn save_agent_weights(&self, weights: &BTreeMap<String, f64>) -> Result<()> {
        let json = serde_json::to_string(weights)?;

        sqlx::query(
            r#"
            INSERT INTO ai_weights (id, weights, version, updated_at)
            VALUES (1, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                weights = excluded.weights,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&json)
        .bind(WEIGHTS_VERSION)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to save agent weights")?;

        debug!("Saved agent weights: {}", json);
        Ok(())
    }

    async fn save_prediction(&self, summary: &PredictionSummary) -> Result<i64> {
        let payload = serde_json::to_string(summary)?;

        let result = sqlx::query(
            r#"
            INSERT INTO predictions (
                match_id,
                fixture,
                league,
                best_market,
                final_prediction,
                final_confidence,
                risk_level,
                status,
                payload,
                created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&summary.match_id)
        .bind(&summary.fixture)
        .bind(&summary.league)
        .bind(&summary.best_market)
        .bind(&summary.final_prediction)
        .bind(summary.final_confidence)
        .bind(summary.risk_level.as_str())
        .bind(LogStatus::Pending.as_str())
        .bind(&payload)
        .bind(format_timestamp(&summary.timestamp))
        .execute(&self.pool)
        .await
        .context("Failed to insert prediction")?;

        Ok(result.last_insert_rowid())
    }
}

#[derive(sqlx::FromRow)]
struct PredictionLogRow {
    id: i64,
    match_id: String,
    agent_name: String,
    market_type: String,
    predicted_outcome: String,
    confidence: f64,
    predicted_at: String,
    status: String,
    is_correct: Option<bool>,
    actual_outcome: Option<String>,
    resolved_at: Option<String>,
}

impl TryFrom<PredictionLogRow> for PredictionLog {
    type Error = anyhow::Error;

    fn try_from(row: PredictionLogRow) -> Result<Self> {
        Ok(PredictionLog {
            id: Some(row.id),
            match_id: row.match_id,
            agent_name: row.agent_name,
            market_type: row.market_type,
            predicted_outcome: row.predicted_outcome,
            confidence: row.confidence,
            predicted_at: require_timestamp(&row.predicted_at, "predicted_at")?,
            status: LogStatus::parse(&row.status),
            is_correct: row.is_correct,
            actual_outcome: row.actual_outcome,
            resolved_at: row.resolved_at.as_deref().and_then(parse_timestamp),
        })
    }
}

#[derive(sqlx::FromRow)]
struct MatchResultRow {
    match_id: String,
    actual_outcome_1n2: String,
    home_score: i32,
    away_score: i32,
    total_goals: i32,
    resolved_at: String,
}

impl TryFrom<MatchResultRow> for MatchResult {
    type Error = anyhow::Error;

    fn try_from(row: MatchResultRow) -> Result<Self> {
        Ok(MatchResult {
            match_id: row.match_id,
            actual_outcome_1n2: row.actual_outcome_1n2,
            home_score: row.home_score,
            away_score: row.away_score,
            total_goals: row.total_goals,
            resolved_at: require_timestamp(&row.resolved_at, "resolved_at")?,
        })
    }
}
