use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market names shared by agents, orchestrator and reports
pub mod markets {
    pub const MATCH_RESULT: &str = "1N2";
    pub const DOUBLE_CHANCE: &str = "DOUBLE_CHANCE";
    pub const OVER_UNDER_1_5: &str = "OVER_UNDER_1.5";
    pub const OVER_UNDER_2_5: &str = "OVER_UNDER_2.5";
    pub const OVER_UNDER_3_5: &str = "OVER_UNDER_3.5";
    pub const OVER_UNDER_HT: &str = "OVER_UNDER_HT";
    pub const BTTS: &str = "BTTS";
    pub const EXACT_GOALS_HOME: &str = "EXACT_GOALS_HOME";
    pub const EXACT_GOALS_AWAY: &str = "EXACT_GOALS_AWAY";
    pub const HT_FT: &str = "HT_FT";
    pub const H2H_ADVANTAGE: &str = "H2H_ADVANTAGE";
    pub const CORNERS: &str = "CORNERS";
    pub const CARDS: &str = "CARDS";
}

/// Label carried by the sentinel result of a failed agent call
pub const ERROR_LABEL: &str = "ERROR";

/// Three-way match outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "HOME_WIN",
            Outcome::Draw => "DRAW",
            Outcome::AwayWin => "AWAY_WIN",
        }
    }

    /// Realized outcome from a final score
    pub fn from_score(home_score: i32, away_score: i32) -> Self {
        if home_score > away_score {
            Outcome::HomeWin
        } else if home_score < away_score {
            Outcome::AwayWin
        } else {
            Outcome::Draw
        }
    }

    /// Safest double-chance cover for this outcome
    pub fn double_chance(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "1N",
            Outcome::AwayWin => "N2",
            Outcome::Draw => "12",
        }
    }

    /// Short prefix used by the HT/FT market (e.g. "HOME_HOME")
    pub fn half_label(&self) -> &'static str {
        match self {
            Outcome::HomeWin => "HOME",
            Outcome::Draw => "DRAW",
            Outcome::AwayWin => "AWAY",
        }
    }
}

/// One agent's call on one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrediction {
    pub market_name: String,
    #[serde(rename = "prediction")]
    pub outcome_label: String,
    pub confidence: f64,
}

impl MarketPrediction {
    pub fn new(market_name: &str, outcome_label: impl Into<String>, confidence: f64) -> Self {
        Self {
            market_name: market_name.to_string(),
            outcome_label: outcome_label.into(),
            confidence,
        }
    }
}

/// Output of a single agent for a single match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_name: String,

    /// Primary 1N2 call
    pub prediction: MarketPrediction,

    pub reasoning: String,

    /// All markets the agent emitted, keyed by market name
    pub markets: BTreeMap<String, MarketPrediction>,

    pub execution_time_ms: f64,

    /// True for the ERROR sentinel
    pub is_error: bool,
}

impl AgentResult {
    /// Sentinel returned in place of an error
    pub fn error(agent_name: &str, message: &str) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            prediction: MarketPrediction::new(markets::MATCH_RESULT, ERROR_LABEL, 0.0),
            reasoning: format!("Error: {}", message),
            markets: BTreeMap::new(),
            execution_time_ms: 0.0,
            is_error: true,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.prediction.confidence
    }

    pub fn outcome_label(&self) -> &str {
        &self.prediction.outcome_label
    }
}

/// Consensus across agents for one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMarket {
    pub market_name: String,
    #[serde(rename = "prediction")]
    pub outcome_label: String,
    pub confidence: f64,
    pub agents_agreed: usize,
    pub total_agents: usize,
}

/// Coarse risk classification of the recommended market
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Low => "STRONG CONFIDENCE - BEST MARKET",
            RiskLevel::Medium => "MODERATE OPPORTUNITY",
            RiskLevel::High => "AVOID - RISK TOO HIGH",
        }
    }
}

/// Flattened per-match prediction, the shape served by `/api/predictions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionSummary {
    #[serde(rename = "match")]
    pub fixture: String,
    pub match_id: String,
    pub league: String,
    pub match_date: Option<DateTime<Utc>>,
    pub best_market: String,
    pub final_prediction: String,
    pub final_confidence: f64,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub reasoning: String,
    pub all_markets: BTreeMap<String, AggregatedMarket>,
    pub execution_time_ms: f64,
    pub timestamp: DateTime<Utc>,
}
