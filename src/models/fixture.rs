use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a fixture as stored in the `matches` table
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Postponed => "postponed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a stored status, unknown values fall back to scheduled
    pub fn parse(s: &str) -> Self {
        match s {
            "live" => MatchStatus::Live,
            "finished" => MatchStatus::Finished,
            "postponed" => MatchStatus::Postponed,
            "cancelled" => MatchStatus::Cancelled,
            _ => MatchStatus::Scheduled,
        }
    }
}

/// A football fixture fetched from one of the data providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    /// Provider match identifier
    pub match_id_api: String,

    pub home_team: String,

    pub away_team: String,

    /// Kick-off time
    pub match_date: DateTime<Utc>,

    /// Competition display name (e.g. "Ligue 1")
    pub league: String,

    /// Competition code (e.g. "FL1"), football-data.org only
    pub competition_code: Option<String>,

    pub status: MatchStatus,

    /// Full-time score
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,

    /// Half-time score
    pub home_score_ht: Option<i32>,
    pub away_score_ht: Option<i32>,

    pub venue: Option<String>,

    pub referee: Option<String>,
}

impl Fixture {
    /// Build the prediction input for this fixture
    pub fn to_match_input(&self) -> MatchInput {
        MatchInput {
            match_id: self.match_id_api.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            league: self.league.clone(),
            match_date: Some(self.match_date),
        }
    }

    /// Final score, if the fixture is finished and both sides are known
    pub fn final_score(&self) -> Option<(i32, i32)> {
        if self.status != MatchStatus::Finished {
            return None;
        }
        Some((self.home_score?, self.away_score?))
    }
}

/// Input to every prediction agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInput {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub match_date: Option<DateTime<Utc>>,
}

impl MatchInput {
    pub fn new(
        match_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        league: impl Into<String>,
        match_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            league: league.into(),
            match_date,
        }
    }

    /// "Home vs Away" label used in reports and the HTTP payload
    pub fn label(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }
}
