use crate::error::AgentError;
use crate::models::{markets, MarketPrediction, MatchInput};

use super::{name_hash, round4, AgentCounters, AgentKind, Analysis, DrawBand, PredictionAgent};

const HOME_TREND_BONUS: f64 = 0.08;

const BAND: DrawBand = DrawBand {
    epsilon: 0.10,
    base: 0.50,
    slope: 0.8,
    draw_confidence: 0.45,
    draw_slope: 0.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Momentum {
    Positive,
    Neutral,
    Negative,
}

impl Momentum {
    fn score(&self) -> f64 {
        match self {
            Momentum::Positive => 0.7,
            Momentum::Neutral => 0.5,
            Momentum::Negative => 0.3,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Momentum::Positive => "Positive",
            Momentum::Neutral => "Neutral",
            Momentum::Negative => "Negative",
        }
    }
}

/// Performance-trend scorer
pub struct TimeSeriesAgent {
    counters: AgentCounters,
}

impl TimeSeriesAgent {
    pub fn new() -> Self {
        Self {
            counters: AgentCounters::default(),
        }
    }

    /// Performance trend in [0.2, 0.9]
    pub fn trend(team: &str, is_home: bool) -> f64 {
        let hash = name_hash(team);
        let mut trend = 0.5 + ((hash % 40) as f64 - 20.0) / 100.0;
        if is_home {
            trend += HOME_TREND_BONUS;
        }
        trend.clamp(0.2, 0.9)
    }

    pub fn momentum(team: &str) -> Momentum {
        match name_hash(team) % 10 {
            0..=3 => Momentum::Positive,
            4..=6 => Momentum::Neutral,
            _ => Momentum::Negative,
        }
    }
}

impl Default for TimeSeriesAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionAgent for TimeSeriesAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::TimeSeries
    }

    fn confidence_range(&self) -> (f64, f64) {
        (0.35, 0.85)
    }

    fn counters(&self) -> &AgentCounters {
        &self.counters
    }

    fn analyze(&self, input: &MatchInput) -> Result<Analysis, AgentError> {
        let home_trend = Self::trend(&input.home_team, true);
        let away_trend = Self::trend(&input.away_team, false);
        let home_momentum = Self::momentum(&input.home_team);
        let away_momentum = Self::momentum(&input.away_team);

        let diff = home_trend - away_trend;
        let (outcome, raw_confidence) = BAND.resolve(0.5 + diff / 2.0);
        let (low, high) = self.confidence_range();
        let confidence = raw_confidence.clamp(low, high);

        let markets = vec![
            over_under(home_trend, away_trend),
            btts(home_momentum, away_momentum),
            MarketPrediction::new(
                markets::DOUBLE_CHANCE,
                outcome.double_chance(),
                round4((confidence + 0.20).min(0.95)),
            ),
            MarketPrediction::new(markets::OVER_UNDER_HT, "OVER_0.5_HT", 0.58),
        ];

        let reasoning = format!(
            "Trend: {} ({:.2}) vs {} ({:.2}). Momentum: {} vs {}.",
            input.home_team,
            home_trend,
            input.away_team,
            away_trend,
            home_momentum.as_str(),
            away_momentum.as_str()
        );

        Ok(Analysis {
            outcome,
            confidence,
            reasoning,
            markets,
        })
    }
}

/// Higher combined trend means more goals
fn over_under(home_trend: f64, away_trend: f64) -> MarketPrediction {
    let avg = (home_trend + away_trend) / 2.0;
    let (label, confidence) = if avg > 0.65 {
        ("OVER_2.5", 0.50 + (avg - 0.65) * 0.5)
    } else if avg < 0.45 {
        ("UNDER_2.5", 0.50 + (0.45 - avg) * 0.5)
    } else {
        ("OVER_2.5", 0.45)
    };
    MarketPrediction::new(
        markets::OVER_UNDER_2_5,
        label,
        round4(confidence.clamp(0.35, 0.85)),
    )
}

fn btts(home: Momentum, away: Momentum) -> MarketPrediction {
    let avg = (home.score() + away.score()) / 2.0;
    let (label, confidence) = if avg > 0.55 {
        ("BTTS_YES", 0.50 + (avg - 0.55) * 0.4)
    } else {
        ("BTTS_NO", 0.50 + (0.55 - avg) * 0.4)
    };
    MarketPrediction::new(markets::BTTS, label, round4(confidence.clamp(0.40, 0.80)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::fixture;

    #[test]
    fn test_trend_home_bonus() {
        let home = TimeSeriesAgent::trend("Lyon", true);
        let away = TimeSeriesAgent::trend("Lyon", false);
        assert!((home - away - HOME_TREND_BONUS).abs() < 1e-9 || home == 0.9);
    }

    #[test]
    fn test_btts_from_momentum() {
        let yes = btts(Momentum::Positive, Momentum::Positive);
        assert_eq!(yes.outcome_label, "BTTS_YES");
        assert!((yes.confidence - 0.56).abs() < 1e-9);

        let no = btts(Momentum::Negative, Momentum::Neutral);
        assert_eq!(no.outcome_label, "BTTS_NO");
        assert!((no.confidence - 0.56).abs() < 1e-9);
    }

    #[test]
    fn test_double_chance_follows_primary() {
        let agent = TimeSeriesAgent::new();
        let result = agent.predict(&fixture("Bayern Munich", "Dortmund", "Bundesliga"));

        let expected = match result.outcome_label() {
            "HOME_WIN" => "1N",
            "AWAY_WIN" => "N2",
            _ => "12",
        };
        assert_eq!(
            result.markets[markets::DOUBLE_CHANCE].outcome_label,
            expected
        );
    }
}
