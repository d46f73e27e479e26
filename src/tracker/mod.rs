//! Accuracy tracking and adaptive agent weights.
//!
//! Every agent call is logged as a pending prediction. Once the real score is
//! known the pending logs of that match are resolved, and the training step
//! turns per-agent calibration (accuracy over average confidence) into new
//! aggregation weights.
//!
//! Persistence is best effort: store failures are logged and the tracker falls
//! back to neutral values so the prediction path never fails because of it.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::agents::AgentKind;
use crate::models::{
    markets, AccuracyStats, LogStatus, MatchResult, Outcome, PredictionLog, PredictionSummary,
    TrainingSummary, WeightChange,
};
use crate::orchestrator::{MAX_WEIGHT, MIN_WEIGHT};

/// Persistence used by the tracker
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    /// Store the log keyed by match, agent and market, returning its id.
    ///
    /// An existing pending log for the key is refreshed in place; a resolved
    /// one is left untouched.
    async fn upsert_prediction_log(&self, log: &PredictionLog) -> Result<i64>;

    async fn pending_predictions(&self, match_id: &str) -> Result<Vec<PredictionLog>>;

    async fn resolve_prediction(
        &self,
        id: i64,
        is_correct: bool,
        actual_outcome: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn upsert_match_result(&self, result: &MatchResult) -> Result<()>;

    /// Resolved logs of one agent and market predicted at or after `since`
    async fn resolved_predictions(
        &self,
        agent_name: &str,
        market_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PredictionLog>>;

    /// Latest saved weights, `None` if training never saved any
    async fn load_agent_weights(&self) -> Result<Option<BTreeMap<String, f64>>>;

    async fn save_agent_weights(&self, weights: &BTreeMap<String, f64>) -> Result<()>;

    /// Store an orchestrated prediction, returning its id
    async fn save_prediction(&self, summary: &PredictionSummary) -> Result<i64>;
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Trailing window for accuracy, in days
    pub window_days: i64,
    /// Below this many resolved logs an agent keeps neutral stats
    pub min_predictions: usize,
    /// Market the weights are trained on
    pub market: String,
    /// Minimum largest weight change for a training step to be saved
    pub save_threshold: f64,
    /// Sum of all weights after rescaling
    pub target_sum: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_predictions: 10,
            market: markets::MATCH_RESULT.to_string(),
            save_threshold: 0.1,
            target_sum: 4.0,
        }
    }
}

pub struct PerformanceTracker {
    store: Arc<dyn PerformanceStore>,
    config: TrackerConfig,
}

impl PerformanceTracker {
    pub fn new(store: Arc<dyn PerformanceStore>, config: TrackerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Record a pending prediction, one per match, agent and market
    pub async fn log_prediction(
        &self,
        match_id: &str,
        agent_name: &str,
        market_type: &str,
        predicted_outcome: &str,
        confidence: f64,
    ) -> bool {
        let log = PredictionLog {
            id: None,
            match_id: match_id.to_string(),
            agent_name: agent_name.to_string(),
            market_type: market_type.to_string(),
            predicted_outcome: predicted_outcome.to_string(),
            confidence,
            predicted_at: Utc::now(),
            status: LogStatus::Pending,
            is_correct: None,
            actual_outcome: None,
            resolved_at: None,
        };

        match self.store.upsert_prediction_log(&log).await {
            Ok(id) => {
                debug!("Logged prediction {} for {} ({})", id, match_id, agent_name);
                true
            }
            Err(e) => {
                warn!("Failed to log prediction for {}: {:#}", match_id, e);
                false
            }
        }
    }

    /// Record the final score of a match and resolve its pending predictions.
    ///
    /// Returns the realized outcome, or `None` if the result could not be stored.
    pub async fn log_result(
        &self,
        match_id: &str,
        home_score: i32,
        away_score: i32,
    ) -> Option<Outcome> {
        let outcome = Outcome::from_score(home_score, away_score);
        let now = Utc::now();

        let result = MatchResult {
            match_id: match_id.to_string(),
            actual_outcome_1n2: outcome.as_str().to_string(),
            home_score,
            away_score,
            total_goals: home_score + away_score,
            resolved_at: now,
        };
        if let Err(e) = self.store.upsert_match_result(&result).await {
            warn!("Failed to store result for {}: {:#}", match_id, e);
            return None;
        }

        let pending = match self.store.pending_predictions(match_id).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!("Failed to load pending predictions for {}: {:#}", match_id, e);
                return Some(outcome);
            }
        };

        let mut resolved = 0;
        for log in pending {
            let Some(id) = log.id else { continue };
            let is_correct = log.predicted_outcome == outcome.as_str();
            match self
                .store
                .resolve_prediction(id, is_correct, outcome.as_str(), now)
                .await
            {
                Ok(()) => resolved += 1,
                Err(e) => warn!("Failed to resolve prediction {}: {:#}", id, e),
            }
        }

        info!(
            "Result {} {}-{} ({}), resolved {} predictions",
            match_id,
            home_score,
            away_score,
            outcome.as_str(),
            resolved
        );
        Some(outcome)
    }

    /// Accuracy of an agent on a market over the last `window_days`
    pub async fn get_agent_accuracy(
        &self,
        agent_name: &str,
        window_days: i64,
        market_type: &str,
    ) -> AccuracyStats {
        let since = Utc::now() - Duration::days(window_days);
        let logs = match self
            .store
            .resolved_predictions(agent_name, market_type, since)
            .await
        {
            Ok(logs) => logs,
            Err(e) => {
                warn!("Failed to load history of {}: {:#}", agent_name, e);
                return AccuracyStats::neutral(0);
            }
        };

        let count = logs.len();
        if count < self.config.min_predictions {
            return AccuracyStats::neutral(count);
        }

        let correct = logs.iter().filter(|l| l.is_correct == Some(true)).count();
        let avg_confidence = logs.iter().map(|l| l.confidence).sum::<f64>() / count as f64;

        AccuracyStats {
            accuracy: correct as f64 / count as f64,
            avg_confidence,
            count,
            correct,
        }
    }

    /// Recalibrated weights, rescaled so they sum to `target_sum`
    pub async fn get_optimal_weights(&self) -> BTreeMap<String, f64> {
        let mut weights = BTreeMap::new();

        for kind in AgentKind::ALL {
            let stats = self
                .get_agent_accuracy(kind.as_str(), self.config.window_days, &self.config.market)
                .await;

            let weight = if stats.count >= self.config.min_predictions {
                let calibration = if stats.avg_confidence > 0.0 {
                    stats.accuracy / stats.avg_confidence
                } else {
                    1.0
                };
                (kind.default_weight() * (0.7 + 0.6 * calibration)).clamp(MIN_WEIGHT, MAX_WEIGHT)
            } else {
                kind.default_weight()
            };
            weights.insert(kind.as_str().to_string(), weight);
        }

        let total: f64 = weights.values().sum();
        if total > 0.0 {
            let factor = self.config.target_sum / total;
            for weight in weights.values_mut() {
                *weight *= factor;
            }
        }
        weights
    }

    /// Saved weights, or the defaults
    pub async fn load_weights(&self) -> BTreeMap<String, f64> {
        match self.store.load_agent_weights().await {
            Ok(Some(weights)) => weights,
            Ok(None) => default_weights(),
            Err(e) => {
                warn!("Failed to load agent weights, using defaults: {:#}", e);
                default_weights()
            }
        }
    }

    pub async fn save_weights(&self, weights: &BTreeMap<String, f64>) -> bool {
        match self.store.save_agent_weights(weights).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save agent weights: {:#}", e);
                false
            }
        }
    }

    pub async fn save_prediction(&self, summary: &PredictionSummary) -> bool {
        match self.store.save_prediction(summary).await {
            Ok(id) => {
                debug!("Saved prediction {} for {}", id, summary.match_id);
                true
            }
            Err(e) => {
                warn!("Failed to save prediction for {}: {:#}", summary.match_id, e);
                false
            }
        }
    }

    /// Recompute weights and save them if any agent moved by `save_threshold`
    pub async fn train_step(&self) -> TrainingSummary {
        info!("Running training step");

        let new_weights = self.get_optimal_weights().await;
        let current = self.load_weights().await;

        let mut changes = BTreeMap::new();
        let mut max_change: f64 = 0.0;
        for kind in AgentKind::ALL {
            let name = kind.as_str();
            let old = current
                .get(name)
                .copied()
                .unwrap_or_else(|| kind.default_weight());
            let new = new_weights.get(name).copied().unwrap_or(old);
            let delta = new - old;
            max_change = max_change.max(delta.abs());
            changes.insert(name.to_string(), WeightChange { old, new, delta });
        }

        let saved = max_change >= self.config.save_threshold && self.save_weights(&new_weights).await;

        info!(
            "Training step done (max change {:.3}, saved: {})",
            max_change, saved
        );

        TrainingSummary {
            weights: new_weights,
            changes,
            max_change,
            saved,
        }
    }
}

pub fn default_weights() -> BTreeMap<String, f64> {
    AgentKind::ALL
        .into_iter()
        .map(|kind| (kind.as_str().to_string(), kind.default_weight()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn tracker(store: Arc<MemoryStore>) -> PerformanceTracker {
        PerformanceTracker::new(store, TrackerConfig::default())
    }

    /// Seed `total` resolved 1N2 logs for an agent, `correct` of them right
    fn seed_history(store: &MemoryStore, agent: &str, total: usize, correct: usize, confidence: f64) {
        let mut logs = store.logs.lock().unwrap();
        for i in 0..total {
            let id = logs.len() as i64 + 1;
            logs.push(PredictionLog {
                id: Some(id),
                match_id: format!("{}-{}", agent, i),
                agent_name: agent.to_string(),
                market_type: markets::MATCH_RESULT.to_string(),
                predicted_outcome: "HOME_WIN".to_string(),
                confidence,
                predicted_at: Utc::now() - Duration::days(1),
                status: LogStatus::Resolved,
                is_correct: Some(i < correct),
                actual_outcome: Some("HOME_WIN".to_string()),
                resolved_at: Some(Utc::now()),
            });
        }
    }

    #[tokio::test]
    async fn test_draw_result_resolves_pending_logs() {
        let store = Arc::new(MemoryStore::default());
        let tracker = tracker(store.clone());

        assert!(tracker.log_prediction("m1", "statistician", "1N2", "DRAW", 0.25).await);
        assert!(tracker.log_prediction("m1", "form_detector", "1N2", "HOME_WIN", 0.6).await);
        assert!(tracker.log_prediction("m1", "time_series", "1N2", "DRAW", 0.45).await);
        assert!(tracker.log_prediction("m2", "statistician", "1N2", "DRAW", 0.25).await);

        let outcome = tracker.log_result("m1", 2, 2).await;
        assert_eq!(outcome, Some(Outcome::Draw));

        let result = store.results.lock().unwrap()["m1"].clone();
        assert_eq!(result.actual_outcome_1n2, "DRAW");
        assert_eq!(result.total_goals, 4);

        let logs = store.logs.lock().unwrap();
        for log in logs.iter().filter(|l| l.match_id == "m1") {
            assert_eq!(log.status, LogStatus::Resolved);
            assert_eq!(log.is_correct, Some(log.predicted_outcome == "DRAW"));
            assert_eq!(log.actual_outcome.as_deref(), Some("DRAW"));
        }
        let other = logs.iter().find(|l| l.match_id == "m2").unwrap();
        assert_eq!(other.status, LogStatus::Pending);
    }

    #[tokio::test]
    async fn test_sparse_history_is_neutral() {
        let store = Arc::new(MemoryStore::default());
        seed_history(&store, "statistician", 5, 5, 0.8);
        let tracker = tracker(store);

        let stats = tracker.get_agent_accuracy("statistician", 30, "1N2").await;
        assert_eq!(stats, AccuracyStats::neutral(5));
    }

    #[tokio::test]
    async fn test_accuracy_over_window() {
        let store = Arc::new(MemoryStore::default());
        seed_history(&store, "form_detector", 12, 9, 0.6);
        let tracker = tracker(store);

        let stats = tracker.get_agent_accuracy("form_detector", 30, "1N2").await;
        assert_eq!(stats.count, 12);
        assert_eq!(stats.correct, 9);
        assert!((stats.accuracy - 0.75).abs() < 1e-9);
        assert!((stats.avg_confidence - 0.6).abs() < 1e-9);

        // Logs predicted a day ago fall outside a zero-day window
        let stats = tracker.get_agent_accuracy("form_detector", 0, "1N2").await;
        assert_eq!(stats.count, 0);
    }

    #[tokio::test]
    async fn test_optimal_weights_sum_to_target() {
        let store = Arc::new(MemoryStore::default());
        seed_history(&store, "statistician", 12, 9, 0.6);
        seed_history(&store, "context_analyst", 20, 2, 0.7);
        let tracker = tracker(store);

        let weights = tracker.get_optimal_weights().await;
        let sum: f64 = weights.values().sum();
        assert!((sum - 4.0).abs() < 1e-9);
        assert_eq!(weights.len(), 4);

        // Well calibrated statistician gains share, overconfident analyst loses it
        assert!(weights["statistician"] / weights["form_detector"] > 1.2);
        assert!(weights["context_analyst"] / weights["form_detector"] < 0.8);
    }

    #[tokio::test]
    async fn test_zero_confidence_history_uses_unit_calibration() {
        let store = Arc::new(MemoryStore::default());
        seed_history(&store, "form_detector", 10, 3, 0.0);
        let tracker = tracker(store);

        let stats = tracker.get_agent_accuracy("form_detector", 30, "1N2").await;
        assert_eq!(stats.avg_confidence, 0.0);

        // Calibration falls back to 1.0, so the raw weight is default * 1.3
        let raw = AgentKind::FormDetector.default_weight() * 1.3;
        let others: f64 = AgentKind::ALL
            .iter()
            .filter(|k| **k != AgentKind::FormDetector)
            .map(|k| k.default_weight())
            .sum();
        let expected = raw * 4.0 / (raw + others);

        let weights = tracker.get_optimal_weights().await;
        assert!(weights["form_detector"].is_finite());
        assert!((weights["form_detector"] - expected).abs() < 1e-9);
        let sum: f64 = weights.values().sum();
        assert!((sum - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_repeated_prediction_keeps_one_log() {
        let store = Arc::new(MemoryStore::default());
        let tracker = tracker(store.clone());

        for confidence in [0.4, 0.45, 0.5] {
            assert!(
                tracker
                    .log_prediction("m1", "statistician", "1N2", "HOME_WIN", confidence)
                    .await
            );
        }
        assert_eq!(store.logs.lock().unwrap().len(), 1);
        assert_eq!(store.logs.lock().unwrap()[0].confidence, 0.5);

        tracker.log_result("m1", 1, 0).await;
        let logs = store.logs.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].is_correct, Some(true));
    }

    #[tokio::test]
    async fn test_small_change_is_not_saved() {
        let store = Arc::new(MemoryStore::default());
        let tracker = tracker(store.clone());

        // No history: defaults rescaled from 3.9 to 4.0, largest move about 0.03
        let summary = tracker.train_step().await;
        assert!(summary.max_change < 0.1);
        assert!(!summary.saved);
        assert!(store.weights.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_large_change_is_saved() {
        let store = Arc::new(MemoryStore::default());
        seed_history(&store, "statistician", 20, 19, 0.5);
        let tracker = tracker(store.clone());

        let summary = tracker.train_step().await;
        assert!(summary.max_change >= 0.1);
        assert!(summary.saved);
        assert_eq!(store.weights.lock().unwrap().as_ref(), Some(&summary.weights));

        let change = summary.changes["statistician"];
        assert_eq!(change.old, 1.2);
        assert!((change.delta - (change.new - change.old)).abs() < 1e-12);

        assert_eq!(tracker.load_weights().await, summary.weights);
    }

    #[tokio::test]
    async fn test_failing_store_degrades() {
        let store = Arc::new(MemoryStore::failing());
        let tracker = tracker(store);

        assert!(!tracker.log_prediction("m1", "statistician", "1N2", "DRAW", 0.3).await);
        assert_eq!(tracker.log_result("m1", 1, 0).await, None);
        assert_eq!(
            tracker.get_agent_accuracy("statistician", 30, "1N2").await,
            AccuracyStats::neutral(0)
        );
        assert_eq!(tracker.load_weights().await, default_weights());

        let summary = tracker.train_step().await;
        assert!(!summary.saved);
    }
}
