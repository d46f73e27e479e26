use crate::error::AgentError;
use crate::models::{markets, MarketPrediction, MatchInput};

use super::{name_hash, round4, AgentCounters, AgentKind, Analysis, DrawBand, PredictionAgent};

const HIGH_STAKES_LEAGUES: [&str; 4] = ["Premier League", "La Liga", "Champions League", "Ligue 1"];
const AGGRESSIVE_LEAGUES: [&str; 3] = ["Serie A", "La Liga", "Championship"];

const BAND: DrawBand = DrawBand {
    epsilon: 0.05,
    base: 0.475,
    slope: 0.5,
    draw_confidence: 0.40,
    draw_slope: 0.0,
};

/// Match-context scorer: head-to-head, venue form and league stakes
pub struct ContextAnalystAgent {
    counters: AgentCounters,
}

/// Context factors, each in [0, 1]
#[derive(Debug, Clone, Copy)]
pub struct ContextFactors {
    /// Above 0.5 favours the home side
    pub h2h: f64,
    pub home_performance: f64,
    pub away_performance: f64,
    pub stakes: f64,
}

impl ContextFactors {
    /// Home-leaning score, a strong away side pulls it down
    pub fn score(&self) -> f64 {
        (self.h2h + self.home_performance + (1.0 - self.away_performance) + self.stakes) / 4.0
    }
}

impl ContextAnalystAgent {
    pub fn new() -> Self {
        Self {
            counters: AgentCounters::default(),
        }
    }

    pub fn factors(input: &MatchInput) -> ContextFactors {
        let home_hash = name_hash(&input.home_team) as i64;
        let away_hash = name_hash(&input.away_team) as i64;

        let h2h = 0.5 + (((home_hash - away_hash).rem_euclid(30)) - 15) as f64 / 100.0;
        let home_base = 0.5 + ((home_hash % 35) - 17) as f64 / 100.0;
        let away_base = 0.5 + ((away_hash % 35) - 17) as f64 / 100.0;

        let stakes = if HIGH_STAKES_LEAGUES.iter().any(|l| input.league.contains(l)) {
            0.65
        } else {
            0.50
        };

        ContextFactors {
            h2h: h2h.clamp(0.3, 0.8),
            home_performance: (home_base + 0.10).clamp(0.3, 0.9),
            away_performance: (away_base - 0.10).clamp(0.2, 0.8),
            stakes,
        }
    }
}

impl Default for ContextAnalystAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionAgent for ContextAnalystAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ContextAnalyst
    }

    fn confidence_range(&self) -> (f64, f64) {
        (0.35, 0.80)
    }

    fn counters(&self) -> &AgentCounters {
        &self.counters
    }

    fn analyze(&self, input: &MatchInput) -> Result<Analysis, AgentError> {
        let factors = Self::factors(input);

        let (outcome, raw_confidence) = BAND.resolve(factors.score());
        let (low, high) = self.confidence_range();
        let confidence = raw_confidence.clamp(low, high);

        let h2h_side = if factors.h2h > 0.5 { "HOME" } else { "AWAY" };
        let markets = vec![
            MarketPrediction::new(
                markets::H2H_ADVANTAGE,
                h2h_side,
                round4(factors.h2h.max(1.0 - factors.h2h)),
            ),
            corners(&input.home_team, &input.away_team),
            cards(&input.league),
        ];

        let reasoning = format!(
            "H2H: {:.0}% | Home: {:.0}% | Away: {:.0}% | Stakes: {:.0}%",
            factors.h2h * 100.0,
            factors.home_performance * 100.0,
            factors.away_performance * 100.0,
            factors.stakes * 100.0
        );

        Ok(Analysis {
            outcome,
            confidence,
            reasoning,
            markets,
        })
    }
}

fn corners(home: &str, away: &str) -> MarketPrediction {
    let avg_hash = (name_hash(home) + name_hash(away)) as f64 / 2.0;
    let (label, confidence) = if avg_hash % 100.0 > 50.0 {
        ("OVER_9.5", 0.50 + (avg_hash % 50.0) / 100.0)
    } else {
        ("UNDER_9.5", 0.50 + (50.0 - avg_hash % 50.0) / 100.0)
    };
    MarketPrediction::new(markets::CORNERS, label, round4(confidence.clamp(0.40, 0.80)))
}

fn cards(league: &str) -> MarketPrediction {
    if AGGRESSIVE_LEAGUES.iter().any(|l| league.contains(l)) {
        MarketPrediction::new(markets::CARDS, "OVER_4.5", 0.55)
    } else {
        MarketPrediction::new(markets::CARDS, "UNDER_4.5", 0.50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::fixture;

    #[test]
    fn test_stakes_by_league() {
        let ligue1 = ContextAnalystAgent::factors(&fixture("PSG", "Marseille", "Ligue 1"));
        let other = ContextAnalystAgent::factors(&fixture("PSG", "Marseille", "Coupe de France"));
        assert_eq!(ligue1.stakes, 0.65);
        assert_eq!(other.stakes, 0.50);
        assert!(ligue1.score() > other.score());
    }

    #[test]
    fn test_factor_ranges() {
        for (home, away) in [("PSG", "Marseille"), ("A", "Zzzzzzzzzz"), ("Zzzzzzzzzz", "A")] {
            let f = ContextAnalystAgent::factors(&fixture(home, away, "Ligue 1"));
            assert!((0.3..=0.8).contains(&f.h2h));
            assert!((0.3..=0.9).contains(&f.home_performance));
            assert!((0.2..=0.8).contains(&f.away_performance));
        }
    }

    #[test]
    fn test_cards_market() {
        assert_eq!(cards("Serie A").outcome_label, "OVER_4.5");
        assert_eq!(cards("Bundesliga").outcome_label, "UNDER_4.5");
    }

    #[test]
    fn test_psg_marseille_markets() {
        let agent = ContextAnalystAgent::new();
        let result = agent.predict(&fixture("PSG", "Marseille", "Ligue 1"));

        assert!(!result.is_error);
        assert!(result.reasoning.contains("Stakes: 65%"));
        for market in [
            markets::MATCH_RESULT,
            markets::H2H_ADVANTAGE,
            markets::CORNERS,
            markets::CARDS,
        ] {
            assert!(result.markets.contains_key(market));
        }
        let corners = &result.markets[markets::CORNERS];
        assert!(corners.confidence >= 0.40 && corners.confidence <= 0.80);
    }
}
