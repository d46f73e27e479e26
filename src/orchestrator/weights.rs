use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::agents::AgentKind;

pub const MIN_WEIGHT: f64 = 0.5;
pub const MAX_WEIGHT: f64 = 2.0;

/// Per-agent aggregation weights, always within [MIN_WEIGHT, MAX_WEIGHT]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentWeights(BTreeMap<AgentKind, f64>);

impl Default for AgentWeights {
    fn default() -> Self {
        Self(
            AgentKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.default_weight()))
                .collect(),
        )
    }
}

impl AgentWeights {
    /// Build from a name-keyed map (the persisted shape). Unknown agents are
    /// skipped, missing ones keep their default.
    pub fn from_names(map: &BTreeMap<String, f64>) -> Self {
        let mut weights = Self::default();
        for (name, value) in map {
            match AgentKind::parse(name) {
                Some(kind) => weights.set_weight(kind, *value),
                None => warn!("Ignoring weight for unknown agent '{}'", name),
            }
        }
        weights
    }

    pub fn to_names(&self) -> BTreeMap<String, f64> {
        self.0
            .iter()
            .map(|(kind, weight)| (kind.as_str().to_string(), *weight))
            .collect()
    }

    /// Set one weight, clamped into range. Non-finite values are ignored.
    pub fn set_weight(&mut self, kind: AgentKind, value: f64) {
        if !value.is_finite() {
            warn!("Ignoring non-finite weight for {}", kind.as_str());
            return;
        }
        self.0.insert(kind, value.clamp(MIN_WEIGHT, MAX_WEIGHT));
    }

    pub fn get(&self, kind: AgentKind) -> f64 {
        self.0
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_weight())
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = AgentWeights::default();
        assert_eq!(weights.get(AgentKind::Statistician), 1.2);
        assert_eq!(weights.get(AgentKind::ContextAnalyst), 0.8);
        assert!((weights.sum() - 3.9).abs() < 1e-9);
    }

    #[test]
    fn test_set_weight_clamps() {
        let mut weights = AgentWeights::default();

        weights.set_weight(AgentKind::FormDetector, 5.0);
        assert_eq!(weights.get(AgentKind::FormDetector), MAX_WEIGHT);

        weights.set_weight(AgentKind::FormDetector, 0.1);
        assert_eq!(weights.get(AgentKind::FormDetector), MIN_WEIGHT);

        weights.set_weight(AgentKind::FormDetector, f64::NAN);
        assert_eq!(weights.get(AgentKind::FormDetector), MIN_WEIGHT);
    }

    #[test]
    fn test_from_names() {
        let mut stored = BTreeMap::new();
        stored.insert("time_series".to_string(), 1.4);
        stored.insert("statistician".to_string(), 3.0);
        stored.insert("meta_orchestrator".to_string(), 1.5);

        let weights = AgentWeights::from_names(&stored);
        assert_eq!(weights.get(AgentKind::TimeSeries), 1.4);
        assert_eq!(weights.get(AgentKind::Statistician), MAX_WEIGHT);
        assert_eq!(weights.get(AgentKind::FormDetector), 1.0);

        let names = weights.to_names();
        assert_eq!(names.len(), 4);
        assert!(!names.contains_key("meta_orchestrator"));
    }
}
