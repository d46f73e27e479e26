use crate::error::AgentError;
use crate::models::{markets, MarketPrediction, MatchInput};

use super::{name_hash, round4, AgentCounters, AgentKind, Analysis, DrawBand, PredictionAgent};

const BAND: DrawBand = DrawBand {
    epsilon: 0.05,
    base: 0.50,
    slope: 1.0,
    draw_confidence: 0.40,
    draw_slope: 0.6,
};

/// Result of one past match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormResult {
    Win,
    Draw,
    Loss,
}

impl FormResult {
    fn points(&self) -> f64 {
        match self {
            FormResult::Win => 3.0,
            FormResult::Draw => 1.0,
            FormResult::Loss => 0.0,
        }
    }

    fn letter(&self) -> char {
        match self {
            FormResult::Win => 'W',
            FormResult::Draw => 'D',
            FormResult::Loss => 'L',
        }
    }
}

/// Recent-form scorer over a synthetic W/D/L history
pub struct FormDetectorAgent {
    counters: AgentCounters,
    lookback_matches: usize,
}

impl FormDetectorAgent {
    pub fn new() -> Self {
        Self {
            counters: AgentCounters::default(),
            lookback_matches: 5,
        }
    }

    /// Last results of a team, most recent first
    pub fn recent_form(&self, team: &str, is_home: bool) -> Vec<FormResult> {
        let hash = name_hash(team);
        let location_bonus = if is_home { 3 } else { 0 };

        (0..self.lookback_matches as u64)
            .map(|i| match (hash + i * 7 + location_bonus) % 10 {
                0..=3 => FormResult::Win,
                4..=6 => FormResult::Draw,
                _ => FormResult::Loss,
            })
            .collect()
    }

    /// Share of available points, most recent matches weigh more
    pub fn form_score(results: &[FormResult]) -> f64 {
        if results.is_empty() {
            return 0.5;
        }

        let mut score = 0.0;
        let mut total_weight = 0.0;
        for (i, result) in results.iter().rev().enumerate() {
            let weight = 1.0 + i as f64 * 0.15;
            score += result.points() * weight;
            total_weight += 3.0 * weight;
        }

        (score / total_weight).clamp(0.1, 0.9)
    }
}

impl Default for FormDetectorAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionAgent for FormDetectorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::FormDetector
    }

    fn confidence_range(&self) -> (f64, f64) {
        (0.30, 0.85)
    }

    fn counters(&self) -> &AgentCounters {
        &self.counters
    }

    fn analyze(&self, input: &MatchInput) -> Result<Analysis, AgentError> {
        let home_form = self.recent_form(&input.home_team, true);
        let away_form = self.recent_form(&input.away_team, false);

        let home_score = Self::form_score(&home_form);
        let away_score = Self::form_score(&away_form);
        let diff = home_score - away_score;

        let (outcome, raw_confidence) = BAND.resolve(0.5 + diff / 2.0);
        let (low, high) = self.confidence_range();
        let confidence = raw_confidence.clamp(low, high);

        let double_chance = if diff >= 0.0 { "1N" } else { "N2" };
        let markets = vec![
            MarketPrediction::new(
                markets::DOUBLE_CHANCE,
                double_chance,
                round4((confidence + 0.15).min(0.90)),
            ),
            MarketPrediction::new(markets::OVER_UNDER_2_5, "OVER_2.5", 0.55),
            MarketPrediction::new(markets::BTTS, "BTTS_YES", 0.52),
        ];

        let balance = if diff.abs() < 0.1 {
            "equivalent"
        } else if diff.abs() < 0.25 {
            "slightly better"
        } else {
            "clearly better"
        };
        let better = if home_score > away_score {
            &input.home_team
        } else {
            &input.away_team
        };
        let reasoning = format!(
            "Form: {} ({}={}W) vs {} ({}={}W). {} form is {}.",
            input.home_team,
            letters(&home_form),
            wins(&home_form),
            input.away_team,
            letters(&away_form),
            wins(&away_form),
            better,
            balance
        );

        Ok(Analysis {
            outcome,
            confidence,
            reasoning,
            markets,
        })
    }
}

fn letters(results: &[FormResult]) -> String {
    results.iter().map(FormResult::letter).collect()
}

fn wins(results: &[FormResult]) -> usize {
    results.iter().filter(|r| **r == FormResult::Win).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::fixture;

    #[test]
    fn test_recent_form_length() {
        let agent = FormDetectorAgent::new();
        assert_eq!(agent.recent_form("PSG", true).len(), 5);
        assert_ne!(
            agent.recent_form("PSG", true),
            agent.recent_form("PSG", false)
        );
    }

    #[test]
    fn test_form_score_bounds() {
        use FormResult::*;

        assert_eq!(FormDetectorAgent::form_score(&[]), 0.5);
        assert_eq!(FormDetectorAgent::form_score(&[Win; 5]), 0.9);
        assert_eq!(FormDetectorAgent::form_score(&[Loss; 5]), 0.1);
    }

    #[test]
    fn test_form_score_weights_recent_results() {
        use FormResult::*;

        let recent_win = FormDetectorAgent::form_score(&[Win, Loss, Loss, Loss, Loss]);
        let old_win = FormDetectorAgent::form_score(&[Loss, Loss, Loss, Loss, Win]);
        assert!(recent_win > old_win);
    }

    #[test]
    fn test_emits_form_markets() {
        let agent = FormDetectorAgent::new();
        let result = agent.predict(&fixture("PSG", "Lyon", "Ligue 1"));

        assert!(result.reasoning.starts_with("Form: PSG ("));
        assert_eq!(result.markets.len(), 4);
        assert_eq!(result.markets[markets::BTTS].outcome_label, "BTTS_YES");
    }
}
