pub mod context_analyst;
pub mod form_detector;
pub mod statistician;
pub mod time_series;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::AgentError;
use crate::models::{markets, AgentResult, MarketPrediction, MatchInput, Outcome};

pub use context_analyst::ContextAnalystAgent;
pub use form_detector::FormDetectorAgent;
pub use statistician::StatisticianAgent;
pub use time_series::TimeSeriesAgent;

/// The four scorers of the ensemble, in canonical order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Statistician,
    FormDetector,
    TimeSeries,
    ContextAnalyst,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Statistician,
        AgentKind::FormDetector,
        AgentKind::TimeSeries,
        AgentKind::ContextAnalyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Statistician => "statistician",
            AgentKind::FormDetector => "form_detector",
            AgentKind::TimeSeries => "time_series",
            AgentKind::ContextAnalyst => "context_analyst",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        AgentKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Weight used before any training has happened
    pub fn default_weight(&self) -> f64 {
        match self {
            AgentKind::Statistician => 1.2,
            AgentKind::FormDetector => 1.0,
            AgentKind::TimeSeries => 0.9,
            AgentKind::ContextAnalyst => 0.8,
        }
    }
}

/// Pseudo-statistic seed: sum of the character codes of the lower-cased name
pub fn name_hash(name: &str) -> u64 {
    name.to_lowercase().chars().map(|c| c as u64).sum()
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Draw band around a neutral score of 0.5.
///
/// Scores within `epsilon` of 0.5 predict a draw. Outside the band the favoured
/// side wins with a confidence linear in the margin.
#[derive(Debug, Clone, Copy)]
pub struct DrawBand {
    pub epsilon: f64,
    pub base: f64,
    pub slope: f64,
    pub draw_confidence: f64,
    /// Extra draw confidence per unit of margin
    pub draw_slope: f64,
}

/// Absorbs float error so both `0.5 ± epsilon` edges land in the band
const BAND_TOLERANCE: f64 = 1e-9;

impl DrawBand {
    /// Resolve a home-leaning score in [0, 1] into an outcome and raw confidence
    pub fn resolve(&self, score: f64) -> (Outcome, f64) {
        let margin = (score - 0.5).abs();
        if margin <= self.epsilon + BAND_TOLERANCE {
            return (Outcome::Draw, self.draw_confidence + self.draw_slope * margin);
        }
        let outcome = if score > 0.5 {
            Outcome::HomeWin
        } else {
            Outcome::AwayWin
        };
        (outcome, self.base + self.slope * margin)
    }
}

/// Result of an agent's analysis before it is wrapped into an `AgentResult`
#[derive(Debug, Clone)]
pub struct Analysis {
    pub outcome: Outcome,
    pub confidence: f64,
    pub reasoning: String,
    /// Secondary markets, the primary 1N2 market is added by `predict`
    pub markets: Vec<MarketPrediction>,
}

/// Per-agent call counters
#[derive(Debug, Default)]
pub struct AgentCounters {
    total: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of an agent's counters
#[derive(Debug, Clone, Serialize)]
pub struct AgentStats {
    pub name: &'static str,
    pub total_predictions: u64,
    pub failed_predictions: u64,
}

/// Capability shared by every scorer of the ensemble
pub trait PredictionAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    /// Range the primary confidence is clamped into
    fn confidence_range(&self) -> (f64, f64);

    fn counters(&self) -> &AgentCounters;

    /// Score a validated match
    fn analyze(&self, input: &MatchInput) -> Result<Analysis, AgentError>;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Run the agent. Failures come back as the ERROR sentinel result.
    fn predict(&self, input: &MatchInput) -> AgentResult {
        let started = Instant::now();

        match run_agent(self, input) {
            Ok(mut result) => {
                result.execution_time_ms =
                    round4(started.elapsed().as_secs_f64() * 1000.0);
                self.counters().total.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "{}: {} ({:.1}%) in {}ms",
                    self.name(),
                    result.outcome_label(),
                    result.confidence() * 100.0,
                    result.execution_time_ms
                );
                result
            }
            Err(e) => {
                self.counters().errors.fetch_add(1, Ordering::Relaxed);
                error!("{}: prediction failed: {}", self.name(), e);
                AgentResult::error(self.name(), &e.to_string())
            }
        }
    }

    fn stats(&self) -> AgentStats {
        AgentStats {
            name: self.name(),
            total_predictions: self.counters().total.load(Ordering::Relaxed),
            failed_predictions: self.counters().errors.load(Ordering::Relaxed),
        }
    }
}

fn run_agent<A: PredictionAgent + ?Sized>(
    agent: &A,
    input: &MatchInput,
) -> Result<AgentResult, AgentError> {
    validate_input(input)?;

    let analysis = agent.analyze(input)?;
    let (low, high) = agent.confidence_range();
    if !analysis.confidence.is_finite() {
        return Err(AgentError::Computation(format!(
            "non-finite confidence for {}",
            markets::MATCH_RESULT
        )));
    }
    let confidence = round4(analysis.confidence.clamp(low, high));
    let primary =
        MarketPrediction::new(markets::MATCH_RESULT, analysis.outcome.as_str(), confidence);

    let mut market_map = BTreeMap::new();
    market_map.insert(primary.market_name.clone(), primary.clone());
    for market in analysis.markets {
        validate_confidence(&market)?;
        if market_map.contains_key(&market.market_name) {
            return Err(AgentError::Computation(format!(
                "duplicate market {}",
                market.market_name
            )));
        }
        market_map.insert(market.market_name.clone(), market);
    }

    Ok(AgentResult {
        agent_name: agent.name().to_string(),
        prediction: primary,
        reasoning: analysis.reasoning,
        markets: market_map,
        execution_time_ms: 0.0,
        is_error: false,
    })
}

fn validate_input(input: &MatchInput) -> Result<(), AgentError> {
    if input.home_team.trim().is_empty() {
        return Err(AgentError::InvalidInput("missing home_team".to_string()));
    }
    if input.away_team.trim().is_empty() {
        return Err(AgentError::InvalidInput("missing away_team".to_string()));
    }
    if input.match_date.is_none() {
        return Err(AgentError::InvalidInput("missing match_date".to_string()));
    }
    Ok(())
}

fn validate_confidence(market: &MarketPrediction) -> Result<(), AgentError> {
    if !market.confidence.is_finite() || !(0.0..=1.0).contains(&market.confidence) {
        return Err(AgentError::Computation(format!(
            "confidence {} out of range for {}",
            market.confidence, market.market_name
        )));
    }
    Ok(())
}

/// The default ensemble in canonical order
pub fn default_agents() -> Vec<Box<dyn PredictionAgent>> {
    vec![
        Box::new(StatisticianAgent::new()),
        Box::new(FormDetectorAgent::new()),
        Box::new(TimeSeriesAgent::new()),
        Box::new(ContextAnalystAgent::new()),
    ]
}


#[cfg(test)]
mod tests {
    use super::testing::{fixture, PAIRS};
    use super::*;
    use crate::models::ERROR_LABEL;

    #[test]
    fn test_name_hash_is_case_insensitive() {
        assert_eq!(name_hash("PSG"), name_hash("psg"));
        assert_eq!(name_hash("psg"), 112 + 115 + 103);
        assert_eq!(name_hash(""), 0);
    }

    #[test]
    fn test_draw_band() {
        let band = DrawBand {
            epsilon: 0.05,
            base: 0.5,
            slope: 1.0,
            draw_confidence: 0.4,
            draw_slope: 0.0,
        };

        assert_eq!(band.resolve(0.5).0, Outcome::Draw);
        assert_eq!(band.resolve(0.55).0, Outcome::Draw);
        let (outcome, confidence) = band.resolve(0.7);
        assert_eq!(outcome, Outcome::HomeWin);
        assert!((confidence - 0.7).abs() < 1e-12);
        assert_eq!(band.resolve(0.3).0, Outcome::AwayWin);
    }

    #[test]
    fn test_draw_band_edges_are_symmetric() {
        for epsilon in [0.03, 0.05, 0.08, 0.1] {
            let band = DrawBand {
                epsilon,
                base: 0.5,
                slope: 1.0,
                draw_confidence: 0.4,
                draw_slope: 0.0,
            };

            assert_eq!(band.resolve(0.5 + epsilon).0, Outcome::Draw);
            assert_eq!(band.resolve(0.5 - epsilon).0, Outcome::Draw);
            assert_eq!(band.resolve(0.5 + epsilon + 0.001).0, Outcome::HomeWin);
            assert_eq!(band.resolve(0.5 - epsilon - 0.001).0, Outcome::AwayWin);
        }
    }

    #[test]
    fn test_agent_kind_roundtrip() {
        for kind in AgentKind::ALL {
            assert_eq!(AgentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(AgentKind::parse("meta_orchestrator"), None);

        let sum: f64 = AgentKind::ALL.iter().map(|k| k.default_weight()).sum();
        assert!((sum - 3.9).abs() < 1e-9);
    }

    #[test]
    fn test_confidences_stay_in_range() {
        for agent in default_agents() {
            let (low, high) = agent.confidence_range();
            for (home, away, league) in PAIRS {
                let result = agent.predict(&fixture(home, away, league));
                assert!(!result.is_error, "{} failed on {home}", agent.name());
                assert!(result.confidence() >= low && result.confidence() <= high);
                for market in result.markets.values() {
                    assert!((0.0..=1.0).contains(&market.confidence));
                }
            }
        }
    }

    #[test]
    fn test_predictions_are_idempotent() {
        for agent in default_agents() {
            let input = fixture("Real Madrid", "Barcelona", "La Liga");
            let first = agent.predict(&input);
            let second = agent.predict(&input);
            assert_eq!(first.prediction, second.prediction);
            assert_eq!(first.markets, second.markets);
            assert_eq!(first.reasoning, second.reasoning);
            assert_eq!(agent.stats().total_predictions, 2);
        }
    }

    #[test]
    fn test_missing_match_date_returns_error_sentinel() {
        let mut input = fixture("PSG", "Marseille", "Ligue 1");
        input.match_date = None;

        for agent in default_agents() {
            let result = agent.predict(&input);
            assert!(result.is_error);
            assert_eq!(result.outcome_label(), ERROR_LABEL);
            assert_eq!(result.confidence(), 0.0);
            assert!(result.markets.is_empty());
            assert_eq!(agent.stats().failed_predictions, 1);
        }
    }

    #[test]
    fn test_empty_team_returns_error_sentinel() {
        let agent = StatisticianAgent::new();
        let result = agent.predict(&fixture("", "Marseille", "Ligue 1"));
        assert!(result.is_error);
        assert!(result.reasoning.contains("home_team"));
    }

    struct BrokenAgent {
        counters: AgentCounters,
    }

    impl PredictionAgent for BrokenAgent {
        fn kind(&self) -> AgentKind {
            AgentKind::TimeSeries
        }

        fn confidence_range(&self) -> (f64, f64) {
            (0.0, 1.0)
        }

        fn counters(&self) -> &AgentCounters {
            &self.counters
        }

        fn analyze(&self, _input: &MatchInput) -> Result<Analysis, AgentError> {
            Ok(Analysis {
                outcome: Outcome::Draw,
                confidence: 0.5,
                reasoning: String::new(),
                markets: vec![MarketPrediction::new(markets::BTTS, "BTTS_YES", 1.7)],
            })
        }
    }

    #[test]
    fn test_out_of_range_market_becomes_error_sentinel() {
        let agent = BrokenAgent {
            counters: AgentCounters::default(),
        };
        let result = agent.predict(&fixture("PSG", "Marseille", "Ligue 1"));
        assert!(result.is_error);
        assert_eq!(result.agent_name, "time_series");
    }
}
