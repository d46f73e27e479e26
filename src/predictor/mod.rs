pub mod display;

pub use display::{render_prediction, render_summary};

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::models::{markets, MatchInput, PredictionSummary};
use crate::orchestrator::{AgentWeights, MetaOrchestrator, MetaPrediction, OrchestratorConfig};
use crate::tracker::PerformanceTracker;

/// Fixtures used when the match source has nothing to offer
const DEMO_MATCHES: [(&str, &str, &str); 5] = [
    ("PSG", "Marseille", "Ligue 1"),
    ("Real Madrid", "Barcelona", "La Liga"),
    ("Bayern Munich", "Dortmund", "Bundesliga"),
    ("Manchester City", "Liverpool", "Premier League"),
    ("Juventus", "AC Milan", "Serie A"),
];

/// Provider of fixtures to predict
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Fixtures kicking off in `[from, to)`
    async fn fetch_candidate_matches(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MatchInput>>;
}

/// Matches selected for prediction
#[derive(Debug, Clone)]
pub struct Candidates {
    pub matches: Vec<MatchInput>,
    /// True when the built-in demo fixtures stand in for real ones
    pub demo: bool,
}

/// End-to-end prediction: candidate fixtures, orchestration, persistence
pub struct Predictor {
    orchestrator: MetaOrchestrator,
    source: Arc<dyn MatchSource>,
    tracker: Arc<PerformanceTracker>,
}

impl Predictor {
    pub fn new(
        orchestrator: MetaOrchestrator,
        source: Arc<dyn MatchSource>,
        tracker: Arc<PerformanceTracker>,
    ) -> Self {
        Self {
            orchestrator,
            source,
            tracker,
        }
    }

    /// Build a predictor whose orchestrator uses the latest saved weights
    pub async fn load(
        config: OrchestratorConfig,
        source: Arc<dyn MatchSource>,
        tracker: Arc<PerformanceTracker>,
    ) -> Self {
        let weights = AgentWeights::from_names(&tracker.load_weights().await);
        info!("Agent weights: {:?}", weights.to_names());

        Self::new(MetaOrchestrator::new(config, weights), source, tracker)
    }

    pub fn orchestrator(&self) -> &MetaOrchestrator {
        &self.orchestrator
    }

    /// Predict one match without persisting anything
    pub fn predict_match(&self, input: &MatchInput) -> PredictionSummary {
        self.run(input).0
    }

    fn run(&self, input: &MatchInput) -> (PredictionSummary, MetaPrediction) {
        let started = Instant::now();
        let meta = self.orchestrator.predict(input);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        (summarize(input, &meta, elapsed_ms), meta)
    }

    /// Upcoming fixtures from today, falling back to the demo set
    pub async fn candidate_matches(&self, days: i64, limit: usize) -> Candidates {
        let (from, to) = prediction_window(Utc::now(), days);

        let matches = match self.source.fetch_candidate_matches(from, to).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Failed to load candidate matches: {:#}", e);
                Vec::new()
            }
        };

        if matches.is_empty() {
            info!("No fixtures between {} and {}, using demo matches", from, to);
            return Candidates {
                matches: demo_matches(limit),
                demo: true,
            };
        }

        info!("{} fixtures found", matches.len());
        Candidates {
            matches: matches.into_iter().take(limit).collect(),
            demo: false,
        }
    }

    /// Predict upcoming fixtures without persisting anything
    pub async fn preview_upcoming(&self, days: i64, limit: usize) -> Vec<PredictionSummary> {
        let candidates = self.candidate_matches(days, limit).await;
        candidates
            .matches
            .iter()
            .map(|m| self.predict_match(m))
            .collect()
    }

    /// Predict upcoming fixtures and persist each summary with its agent calls.
    ///
    /// Demo fixtures are predicted but never persisted.
    pub async fn predict_upcoming(&self, days: i64, limit: usize) -> Vec<PredictionSummary> {
        let candidates = self.candidate_matches(days, limit).await;

        let mut summaries = Vec::with_capacity(candidates.matches.len());
        for (i, input) in candidates.matches.iter().enumerate() {
            let (summary, meta) = self.run(input);
            info!(
                "[{}/{}] {}: {} {} ({:.1}%, {} risk)",
                i + 1,
                candidates.matches.len(),
                summary.fixture,
                summary.best_market,
                summary.final_prediction,
                summary.final_confidence * 100.0,
                summary.risk_level.as_str()
            );

            if !candidates.demo {
                self.persist(&summary, &meta).await;
            }
            summaries.push(summary);
        }

        summaries
    }

    async fn persist(&self, summary: &PredictionSummary, meta: &MetaPrediction) {
        self.tracker.save_prediction(summary).await;

        for result in meta.agent_results.iter().filter(|r| !r.is_error) {
            self.tracker
                .log_prediction(
                    &summary.match_id,
                    &result.agent_name,
                    markets::MATCH_RESULT,
                    result.outcome_label(),
                    result.confidence(),
                )
                .await;
        }
    }
}

/// `[start of today, start of today + days)`, at least one day
fn prediction_window(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now);
    (from, from + Duration::days(days.max(1)))
}

fn demo_matches(limit: usize) -> Vec<MatchInput> {
    let now = Utc::now();
    DEMO_MATCHES
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, (home, away, league))| {
            MatchInput::new(format!("demo-{}", i + 1), *home, *away, *league, Some(now))
        })
        .collect()
}

/// Flatten an orchestrated prediction into the served and stored shape
pub fn summarize(input: &MatchInput, meta: &MetaPrediction, elapsed_ms: f64) -> PredictionSummary {
    PredictionSummary {
        fixture: input.label(),
        match_id: input.match_id.clone(),
        league: input.league.clone(),
        match_date: input.match_date,
        best_market: meta.best_market().unwrap_or("NONE").to_string(),
        final_prediction: meta.final_prediction().to_string(),
        final_confidence: meta.final_confidence(),
        risk_level: meta.risk_level,
        recommendation: meta.recommendation.clone(),
        reasoning: meta.reasoning.clone(),
        all_markets: meta.all_markets.clone(),
        execution_time_ms: (elapsed_ms * 100.0).round() / 100.0,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::tracker::memory::MemoryStore;
    use crate::tracker::TrackerConfig;

    struct StaticSource {
        matches: Vec<MatchInput>,
        fail: bool,
    }

    #[async_trait]
    impl MatchSource for StaticSource {
        async fn fetch_candidate_matches(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<MatchInput>> {
            if self.fail {
                anyhow::bail!("source offline");
            }
            Ok(self.matches.clone())
        }
    }

    fn predictor(source: StaticSource, store: Arc<MemoryStore>) -> Predictor {
        let tracker = Arc::new(PerformanceTracker::new(store, TrackerConfig::default()));
        Predictor::new(
            MetaOrchestrator::new(OrchestratorConfig::default(), AgentWeights::default()),
            Arc::new(source),
            tracker,
        )
    }

    fn real_matches() -> Vec<MatchInput> {
        let kickoff = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();
        vec![
            MatchInput::new("fd-1", "PSG", "Marseille", "Ligue 1", Some(kickoff)),
            MatchInput::new("fd-2", "Lyon", "Nice", "Ligue 1", Some(kickoff)),
            MatchInput::new("fd-3", "Lens", "Lille", "Ligue 1", Some(kickoff)),
        ]
    }

    #[test]
    fn test_prediction_window() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 42, 7).unwrap();
        let (from, to) = prediction_window(now, 3);
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 10, 22, 0, 0, 0).unwrap());

        let (_, to) = prediction_window(now, 0);
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 10, 20, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_predict_match_summary() {
        let store = Arc::new(MemoryStore::default());
        let predictor = predictor(
            StaticSource {
                matches: Vec::new(),
                fail: false,
            },
            store,
        );

        let input = &real_matches()[0];
        let summary = predictor.predict_match(input);
        assert_eq!(summary.fixture, "PSG vs Marseille");
        assert_eq!(summary.match_id, "fd-1");
        assert_eq!(summary.recommendation, summary.risk_level.recommendation());
        assert_eq!(
            summary.final_confidence,
            summary.all_markets[&summary.best_market].confidence
        );
    }

    #[tokio::test]
    async fn test_empty_source_falls_back_to_demo() {
        let store = Arc::new(MemoryStore::default());
        let predictor = predictor(
            StaticSource {
                matches: Vec::new(),
                fail: false,
            },
            store.clone(),
        );

        let summaries = predictor.predict_upcoming(3, 10).await;
        assert_eq!(summaries.len(), 5);
        assert_eq!(summaries[0].fixture, "PSG vs Marseille");
        assert!(store.predictions.lock().unwrap().is_empty());
        assert!(store.logs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_source_falls_back_to_demo() {
        let store = Arc::new(MemoryStore::default());
        let predictor = predictor(
            StaticSource {
                matches: real_matches(),
                fail: true,
            },
            store,
        );

        let candidates = predictor.candidate_matches(3, 2).await;
        assert!(candidates.demo);
        assert_eq!(candidates.matches.len(), 2);
    }

    #[tokio::test]
    async fn test_predict_upcoming_persists() {
        let store = Arc::new(MemoryStore::default());
        let predictor = predictor(
            StaticSource {
                matches: real_matches(),
                fail: false,
            },
            store.clone(),
        );

        let summaries = predictor.predict_upcoming(3, 2).await;
        assert_eq!(summaries.len(), 2);
        assert_eq!(store.predictions.lock().unwrap().len(), 2);

        // One primary 1N2 log per agent per match
        let logs = store.logs.lock().unwrap();
        assert_eq!(logs.len(), 8);
        assert!(logs.iter().all(|l| l.market_type == markets::MATCH_RESULT));
        assert_eq!(logs.iter().filter(|l| l.match_id == "fd-2").count(), 4);
    }

    #[tokio::test]
    async fn test_repeated_runs_log_each_agent_once() {
        let store = Arc::new(MemoryStore::default());
        let predictor = predictor(
            StaticSource {
                matches: real_matches(),
                fail: false,
            },
            store.clone(),
        );

        for _ in 0..3 {
            predictor.predict_upcoming(3, 1).await;
        }
        assert_eq!(store.logs.lock().unwrap().len(), 4);

        predictor.tracker.log_result("fd-1", 2, 0).await;
        let stats = predictor
            .tracker
            .get_agent_accuracy("statistician", 30, markets::MATCH_RESULT)
            .await;
        assert_eq!(stats.count, 1);
    }

    #[tokio::test]
    async fn test_load_applies_saved_weights() {
        let store = Arc::new(MemoryStore::default());
        let mut saved = crate::tracker::default_weights();
        saved.insert("statistician".to_string(), 1.7);
        *store.weights.lock().unwrap() = Some(saved);

        let tracker = Arc::new(PerformanceTracker::new(store, TrackerConfig::default()));
        let predictor = Predictor::load(
            OrchestratorConfig::default(),
            Arc::new(StaticSource {
                matches: Vec::new(),
                fail: false,
            }),
            tracker,
        )
        .await;

        assert_eq!(
            predictor
                .orchestrator()
                .weights()
                .get(crate::agents::AgentKind::Statistician),
            1.7
        );
    }
}
