use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolution state of a logged prediction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Pending,
    Resolved,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Pending => "pending",
            LogStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "resolved" => LogStatus::Resolved,
            _ => LogStatus::Pending,
        }
    }
}

/// A single agent prediction awaiting (or checked against) the real result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLog {
    pub id: Option<i64>,
    pub match_id: String,
    pub agent_name: String,
    pub market_type: String,
    pub predicted_outcome: String,
    pub confidence: f64,
    pub predicted_at: DateTime<Utc>,
    pub status: LogStatus,
    pub is_correct: Option<bool>,
    pub actual_outcome: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Realized result of a match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: String,
    pub actual_outcome_1n2: String,
    pub home_score: i32,
    pub away_score: i32,
    pub total_goals: i32,
    pub resolved_at: DateTime<Utc>,
}

/// Accuracy of one agent over a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub accuracy: f64,
    pub avg_confidence: f64,
    /// Resolved predictions in the window
    pub count: usize,
    pub correct: usize,
}

impl AccuracyStats {
    /// Neutral stats used when history is missing or too thin
    pub fn neutral(count: usize) -> Self {
        Self {
            accuracy: 0.5,
            avg_confidence: 0.5,
            count,
            correct: 0,
        }
    }
}

/// Old/new weight of one agent after a training step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightChange {
    pub old: f64,
    pub new: f64,
    pub delta: f64,
}

/// Outcome of `PerformanceTracker::train_step`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub weights: BTreeMap<String, f64>,
    pub changes: BTreeMap<String, WeightChange>,
    pub max_change: f64,
    pub saved: bool,
}
