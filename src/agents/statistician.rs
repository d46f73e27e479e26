use crate::error::AgentError;
use crate::models::{markets, MarketPrediction, MatchInput, Outcome};

use super::{name_hash, round4, AgentCounters, AgentKind, Analysis, DrawBand, PredictionAgent};

const LEAGUE_AVG_GOALS: f64 = 1.4;
const HOME_ADVANTAGE: f64 = 1.15;
const MIN_XG: f64 = 0.3;
const MAX_XG: f64 = 3.0;

/// Share of total goals scored before half-time
const FIRST_HALF_SHARE: f64 = 0.45;

const BAND: DrawBand = DrawBand {
    epsilon: 0.03,
    base: 0.375,
    slope: 0.75,
    draw_confidence: 0.25,
    draw_slope: 0.0,
};

/// Expected-goals model over synthetic attack/defence strengths
pub struct StatisticianAgent {
    counters: AgentCounters,
    league_avg_goals: f64,
    home_advantage: f64,
}

/// Synthetic expected goals for both sides
#[derive(Debug, Clone, Copy)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

impl ExpectedGoals {
    pub fn total(&self) -> f64 {
        self.home + self.away
    }

    /// Home share of the expected goals
    pub fn home_share(&self) -> f64 {
        self.home / self.total()
    }
}

impl StatisticianAgent {
    pub fn new() -> Self {
        Self {
            counters: AgentCounters::default(),
            league_avg_goals: LEAGUE_AVG_GOALS,
            home_advantage: HOME_ADVANTAGE,
        }
    }

    pub fn expected_goals(&self, home: &str, away: &str) -> ExpectedGoals {
        let home_hash = name_hash(home);
        let away_hash = name_hash(away);

        let home_attack = strength(home_hash);
        let away_attack = strength(away_hash);
        let home_defense = strength(home_hash / 2);
        let away_defense = strength(away_hash / 2);

        let home_xg = self.league_avg_goals * home_attack * away_defense * self.home_advantage;
        let away_xg = self.league_avg_goals * away_attack * home_defense;

        ExpectedGoals {
            home: home_xg.clamp(MIN_XG, MAX_XG),
            away: away_xg.clamp(MIN_XG, MAX_XG),
        }
    }
}

impl Default for StatisticianAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionAgent for StatisticianAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Statistician
    }

    fn confidence_range(&self) -> (f64, f64) {
        (0.25, 0.90)
    }

    fn counters(&self) -> &AgentCounters {
        &self.counters
    }

    fn analyze(&self, input: &MatchInput) -> Result<Analysis, AgentError> {
        let xg = self.expected_goals(&input.home_team, &input.away_team);
        let total_xg = xg.total();

        let (outcome, raw_confidence) = BAND.resolve(xg.home_share());
        let (low, high) = self.confidence_range();
        let confidence = raw_confidence.clamp(low, high);

        let mut markets = Vec::new();
        for line in [1.5, 2.5, 3.5] {
            markets.push(over_under(line, total_xg));
        }
        markets.push(btts(xg));
        markets.push(exact_goals(markets::EXACT_GOALS_HOME, xg.home));
        markets.push(exact_goals(markets::EXACT_GOALS_AWAY, xg.away));

        let p_goal_ht = 1.0 - poisson_cdf(0, total_xg * FIRST_HALF_SHARE);
        markets.push(if p_goal_ht > 0.5 {
            MarketPrediction::new(markets::OVER_UNDER_HT, "OVER_0.5_HT", round4(p_goal_ht))
        } else {
            MarketPrediction::new(markets::OVER_UNDER_HT, "UNDER_0.5_HT", round4(1.0 - p_goal_ht))
        });

        markets.push(MarketPrediction::new(
            markets::HT_FT,
            format!("{}_{}", outcome.half_label(), outcome.half_label()),
            round4(confidence * 0.8),
        ));

        let double_chance = if outcome == Outcome::AwayWin { "N2" } else { "1N" };
        markets.push(MarketPrediction::new(
            markets::DOUBLE_CHANCE,
            double_chance,
            round4((confidence + 0.15).min(0.90)),
        ));

        let diff = (xg.home - xg.away).abs();
        let balance = if diff < 0.3 {
            "balanced"
        } else if diff < 0.7 {
            "slightly one-sided"
        } else {
            "one-sided"
        };
        let call = match outcome {
            Outcome::HomeWin => format!("{} win", input.home_team),
            Outcome::AwayWin => format!("{} win", input.away_team),
            Outcome::Draw => "draw".to_string(),
        };
        let reasoning = format!(
            "xG: {:.2} vs {:.2} -> {} match -> {} ({:.0}%)",
            xg.home,
            xg.away,
            balance,
            call,
            confidence * 100.0
        );

        Ok(Analysis {
            outcome,
            confidence,
            reasoning,
            markets,
        })
    }
}

fn strength(seed: u64) -> f64 {
    0.9 + (seed % 40) as f64 / 100.0
}

fn poisson_pmf(k: u32, lambda: f64) -> f64 {
    let factorial: f64 = (1..=k).map(f64::from).product();
    lambda.powi(k as i32) * (-lambda).exp() / factorial
}

/// P(X <= n) for X ~ Poisson(lambda)
pub fn poisson_cdf(n: u32, lambda: f64) -> f64 {
    (0..=n).map(|k| poisson_pmf(k, lambda)).sum()
}

fn over_under(line: f64, total_xg: f64) -> MarketPrediction {
    let market = match line {
        l if l < 2.0 => markets::OVER_UNDER_1_5,
        l if l < 3.0 => markets::OVER_UNDER_2_5,
        _ => markets::OVER_UNDER_3_5,
    };
    let p_over = 1.0 - poisson_cdf(line.floor() as u32, total_xg);
    if p_over > 0.5 {
        MarketPrediction::new(market, format!("OVER_{}", line), round4(p_over))
    } else {
        MarketPrediction::new(market, format!("UNDER_{}", line), round4(1.0 - p_over))
    }
}

fn btts(xg: ExpectedGoals) -> MarketPrediction {
    let p_yes = (1.0 - (-xg.home).exp()) * (1.0 - (-xg.away).exp());
    if p_yes > 0.5 {
        MarketPrediction::new(markets::BTTS, "BTTS_YES", round4(p_yes))
    } else {
        MarketPrediction::new(markets::BTTS, "BTTS_NO", round4(1.0 - p_yes))
    }
}

/// Most likely goal count among 0, 1, 2 and 3+
fn exact_goals(market: &str, xg: f64) -> MarketPrediction {
    let mut best_label = "0".to_string();
    let mut best_p = poisson_pmf(0, xg);
    for k in 1..=2 {
        let p = poisson_pmf(k, xg);
        if p > best_p {
            best_label = k.to_string();
            best_p = p;
        }
    }
    let p_three_plus = 1.0 - poisson_cdf(2, xg);
    if p_three_plus > best_p {
        best_label = "3+".to_string();
        best_p = p_three_plus;
    }

    MarketPrediction::new(
        market,
        format!("EXACT_{}_GOALS", best_label),
        round4(best_p.clamp(0.25, 0.70)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::fixture;

    #[test]
    fn test_psg_marseille_scenario() {
        let agent = StatisticianAgent::new();
        let result = agent.predict(&fixture("PSG", "Marseille", "Ligue 1"));

        assert!(!result.is_error);
        assert!(["HOME_WIN", "DRAW", "AWAY_WIN"].contains(&result.outcome_label()));
        assert!(result.confidence() >= 0.20 && result.confidence() <= 0.95);

        let over_under = &result.markets[markets::OVER_UNDER_2_5];
        assert!((0.0..=1.0).contains(&over_under.confidence));
        assert!(over_under.outcome_label == "OVER_2.5" || over_under.outcome_label == "UNDER_2.5");
    }

    #[test]
    fn test_expected_goals_are_clamped() {
        let agent = StatisticianAgent::new();
        let xg = agent.expected_goals("PSG", "Marseille");
        assert!(xg.home >= MIN_XG && xg.home <= MAX_XG);
        assert!(xg.away >= MIN_XG && xg.away <= MAX_XG);
    }

    #[test]
    fn test_home_advantage_favours_home_side() {
        // Same name on both sides: only the home advantage separates them
        let agent = StatisticianAgent::new();
        let xg = agent.expected_goals("Lyon", "Lyon");
        assert!(xg.home > xg.away);
    }

    #[test]
    fn test_poisson_cdf() {
        assert!((poisson_cdf(0, 1.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!((poisson_cdf(50, 2.5) - 1.0).abs() < 1e-9);
        assert!(poisson_cdf(2, 3.0) < poisson_cdf(3, 3.0));
    }

    #[test]
    fn test_emits_goal_markets() {
        let agent = StatisticianAgent::new();
        let result = agent.predict(&fixture("Real Madrid", "Barcelona", "La Liga"));

        for market in [
            markets::MATCH_RESULT,
            markets::OVER_UNDER_1_5,
            markets::OVER_UNDER_2_5,
            markets::OVER_UNDER_3_5,
            markets::BTTS,
            markets::EXACT_GOALS_HOME,
            markets::EXACT_GOALS_AWAY,
            markets::OVER_UNDER_HT,
            markets::HT_FT,
            markets::DOUBLE_CHANCE,
        ] {
            assert!(result.markets.contains_key(market), "missing {market}");
        }

        let exact = &result.markets[markets::EXACT_GOALS_HOME];
        assert!(exact.confidence >= 0.25 && exact.confidence <= 0.70);
    }
}
