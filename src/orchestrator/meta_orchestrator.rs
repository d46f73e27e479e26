use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::agents::{default_agents, AgentKind, AgentStats, PredictionAgent};
use crate::models::{AgentResult, AggregatedMarket, MatchInput, RiskLevel};

use super::weights::AgentWeights;

/// Ceiling on any aggregated confidence
pub const CONFIDENCE_CAP: f64 = 0.95;

/// Confidence at or above which the recommendation is low risk
pub const LOW_RISK_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Minimum confidence for a medium-risk recommendation
    pub risk_threshold: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            risk_threshold: 0.60,
        }
    }
}

/// One agent's vote on one market
#[derive(Debug, Clone)]
struct Vote<'a> {
    kind: AgentKind,
    outcome_label: &'a str,
    confidence: f64,
}

/// Consensus over the whole ensemble for one match
#[derive(Debug, Clone, Serialize)]
pub struct MetaPrediction {
    /// Recommended market, `None` when no agent produced usable output
    pub best: Option<AggregatedMarket>,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub reasoning: String,
    pub all_markets: BTreeMap<String, AggregatedMarket>,
    pub agent_weights: BTreeMap<String, f64>,
    pub agent_results: Vec<AgentResult>,
}

impl MetaPrediction {
    pub fn best_market(&self) -> Option<&str> {
        self.best.as_ref().map(|m| m.market_name.as_str())
    }

    pub fn final_prediction(&self) -> &str {
        self.best
            .as_ref()
            .map(|m| m.outcome_label.as_str())
            .unwrap_or("NO_RECOMMENDATION")
    }

    pub fn final_confidence(&self) -> f64 {
        self.best.as_ref().map(|m| m.confidence).unwrap_or(0.0)
    }
}

/// Runs every agent on a match and merges their markets
pub struct MetaOrchestrator {
    agents: Vec<Box<dyn PredictionAgent>>,
    weights: AgentWeights,
    config: OrchestratorConfig,
}

impl MetaOrchestrator {
    /// Orchestrator over the default four agents
    pub fn new(config: OrchestratorConfig, weights: AgentWeights) -> Self {
        Self::with_agents(default_agents(), weights, config)
    }

    pub fn with_agents(
        agents: Vec<Box<dyn PredictionAgent>>,
        weights: AgentWeights,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            agents,
            weights,
            config,
        }
    }

    pub fn weights(&self) -> &AgentWeights {
        &self.weights
    }

    pub fn agent_stats(&self) -> Vec<AgentStats> {
        self.agents.iter().map(|a| a.stats()).collect()
    }

    pub fn predict(&self, input: &MatchInput) -> MetaPrediction {
        let results: Vec<(AgentKind, AgentResult)> = self
            .agents
            .iter()
            .map(|agent| (agent.kind(), agent.predict(input)))
            .collect();

        let failed = results.iter().filter(|(_, r)| r.is_error).count();
        if failed > 0 {
            warn!(
                "{}/{} agents failed on {}",
                failed,
                results.len(),
                input.label()
            );
        }

        let all_markets = aggregate_markets(&results, &self.weights);
        let best = best_market(&all_markets).cloned();

        let (risk_level, reasoning) = match &best {
            Some(market) => (
                risk_band(market.confidence, self.config.risk_threshold),
                format!(
                    "Best market: {}. {} ({:.1}%). {} markets analysed by {} agents.",
                    market.market_name,
                    market.outcome_label,
                    market.confidence * 100.0,
                    all_markets.len(),
                    results.len() - failed
                ),
            ),
            None => (
                RiskLevel::High,
                format!("No usable agent output for {}", input.label()),
            ),
        };

        debug!(
            "{}: {} markets, best {:?}, risk {}",
            input.label(),
            all_markets.len(),
            best.as_ref().map(|m| &m.market_name),
            risk_level.as_str()
        );

        MetaPrediction {
            best,
            risk_level,
            recommendation: risk_level.recommendation().to_string(),
            reasoning,
            all_markets,
            agent_weights: self.weights.to_names(),
            agent_results: results.into_iter().map(|(_, r)| r).collect(),
        }
    }
}

/// Merge agent outputs market by market.
///
/// The aggregate confidence is the mean of `confidence * weight` over the
/// agents that voted on the market, capped at `CONFIDENCE_CAP`. The label is
/// the plurality vote; a tie goes to the label seen first in agent order.
/// ERROR results contribute nothing.
pub fn aggregate_markets(
    results: &[(AgentKind, AgentResult)],
    weights: &AgentWeights,
) -> BTreeMap<String, AggregatedMarket> {
    let mut votes: BTreeMap<&str, Vec<Vote>> = BTreeMap::new();
    for (kind, result) in results {
        if result.is_error {
            continue;
        }
        for (market_name, market) in &result.markets {
            votes.entry(market_name.as_str()).or_default().push(Vote {
                kind: *kind,
                outcome_label: &market.outcome_label,
                confidence: market.confidence,
            });
        }
    }

    votes
        .into_iter()
        .map(|(market_name, votes)| {
            let weighted_sum: f64 = votes
                .iter()
                .map(|v| v.confidence * weights.get(v.kind))
                .sum();
            let confidence = (weighted_sum / votes.len() as f64).min(CONFIDENCE_CAP);

            let (outcome_label, agents_agreed) = plurality(&votes);

            (
                market_name.to_string(),
                AggregatedMarket {
                    market_name: market_name.to_string(),
                    outcome_label: outcome_label.to_string(),
                    confidence,
                    agents_agreed,
                    total_agents: votes.len(),
                },
            )
        })
        .collect()
}

/// Most voted label, first seen wins ties
fn plurality<'a>(votes: &[Vote<'a>]) -> (&'a str, usize) {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(label, _)| *label == vote.outcome_label) {
            Some((_, count)) => *count += 1,
            None => counts.push((vote.outcome_label, 1)),
        }
    }

    let mut best = ("", 0);
    for (label, count) in counts {
        if count > best.1 {
            best = (label, count);
        }
    }
    best
}

/// Highest-confidence market, first by name on ties
pub fn best_market(markets: &BTreeMap<String, AggregatedMarket>) -> Option<&AggregatedMarket> {
    let mut best: Option<&AggregatedMarket> = None;
    for market in markets.values() {
        if best.map_or(true, |b| market.confidence > b.confidence) {
            best = Some(market);
        }
    }
    best
}

pub fn risk_band(confidence: f64, risk_threshold: f64) -> RiskLevel {
    if confidence >= LOW_RISK_THRESHOLD {
        RiskLevel::Low
    } else if confidence >= risk_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}
