use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Fixture, MatchStatus};

/// Prefix keeping API-Football ids apart from other providers
pub const ID_PREFIX: &str = "af";

/// Client for API-Football v3 through RapidAPI
pub struct ApiFootballClient {
    client: Client,
    base_url: String,
    host: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfFixtureEntry {
    pub fixture: AfFixture,
    pub league: AfLeague,
    pub teams: AfTeams,
    #[serde(default)]
    pub goals: AfGoals,
    pub score: Option<AfScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfFixture {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub referee: Option<String>,
    pub status: AfStatus,
    pub venue: Option<AfVenue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfStatus {
    pub short: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfVenue {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfLeague {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfTeams {
    pub home: AfTeam,
    pub away: AfTeam,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfTeam {
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AfGoals {
    pub home: Option<i32>,
    pub away: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AfScore {
    #[serde(default)]
    pub halftime: AfGoals,
}

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    response: Vec<AfFixtureEntry>,
}

impl AfFixtureEntry {
    pub fn to_fixture(&self) -> Fixture {
        let halftime = self.score.as_ref().map(|s| s.halftime).unwrap_or_default();

        Fixture {
            match_id_api: format!("{}-{}", ID_PREFIX, self.fixture.id),
            home_team: self.teams.home.name.clone(),
            away_team: self.teams.away.name.clone(),
            match_date: self.fixture.date,
            league: self.league.name.clone(),
            competition_code: None,
            status: map_status_short(self.fixture.status.short.as_deref().unwrap_or("")),
            home_score: self.goals.home,
            away_score: self.goals.away,
            home_score_ht: halftime.home,
            away_score_ht: halftime.away,
            venue: self.fixture.venue.as_ref().and_then(|v| v.name.clone()),
            referee: self.fixture.referee.clone(),
        }
    }
}

/// Map an API-Football short status onto the stored lifecycle
pub fn map_status_short(short: &str) -> MatchStatus {
    match short {
        "NS" | "TBD" => MatchStatus::Scheduled,
        "1H" | "HT" | "2H" | "ET" | "BT" | "P" | "LIVE" => MatchStatus::Live,
        "FT" | "AET" | "PEN" => MatchStatus::Finished,
        "PST" => MatchStatus::Postponed,
        "CANC" | "ABD" => MatchStatus::Cancelled,
        _ => MatchStatus::Scheduled,
    }
}

impl ApiFootballClient {
    /// Create a new API-Football client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let host = reqwest::Url::parse(&base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "api-football-v1.p.rapidapi.com".to_string());

        if api_key.is_empty() {
            warn!("API_FOOTBALL_KEY is not set, requests will be rejected");
        }

        Ok(Self {
            client,
            base_url,
            host,
            api_key: api_key.to_string(),
        })
    }

    async fn get_fixtures(&self, url: &str) -> Result<Vec<AfFixtureEntry>> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .send()
            .await
            .context("Failed to reach API-Football")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("API-Football error: {} - {}", status, text);
        }

        let fixtures: FixturesResponse = response
            .json()
            .await
            .context("Failed to parse API-Football response")?;

        Ok(fixtures.response)
    }

    pub async fn get_fixtures_by_date(&self, date: NaiveDate) -> Result<Vec<AfFixtureEntry>> {
        let url = format!("{}/fixtures?date={}", self.base_url, date.format("%Y-%m-%d"));
        self.get_fixtures(&url).await
    }

    pub async fn get_live_fixtures(&self) -> Result<Vec<AfFixtureEntry>> {
        let url = format!("{}/fixtures?live=all", self.base_url);
        self.get_fixtures(&url).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const SAMPLE: &str = r#"{
        "get": "fixtures",
        "results": 1,
        "response": [
            {
                "fixture": {
                    "id": 1035037,
                    "referee": "M. Oliver",
                    "date": "2026-10-19T21:00:00+02:00",
                    "venue": { "id": 556, "name": "Old Trafford" },
                    "status": { "long": "Halftime", "short": "HT", "elapsed": 45 }
                },
                "league": { "id": 39, "name": "Premier League" },
                "teams": {
                    "home": { "id": 33, "name": "Manchester United" },
                    "away": { "id": 40, "name": "Liverpool" }
                },
                "goals": { "home": 1, "away": 1 },
                "score": { "halftime": { "home": 1, "away": 1 } }
            }
        ]
    }"#;

    #[test]
    fn test_status_short_mapping() {
        assert_eq!(map_status_short("NS"), MatchStatus::Scheduled);
        assert_eq!(map_status_short("HT"), MatchStatus::Live);
        assert_eq!(map_status_short("AET"), MatchStatus::Finished);
        assert_eq!(map_status_short("PST"), MatchStatus::Postponed);
        assert_eq!(map_status_short("CANC"), MatchStatus::Cancelled);
        assert_eq!(map_status_short(""), MatchStatus::Scheduled);
    }

    #[test]
    fn test_fixture_conversion() {
        let parsed: FixturesResponse = serde_json::from_str(SAMPLE).unwrap();
        let fixture = parsed.response[0].to_fixture();

        assert_eq!(fixture.match_id_api, "af-1035037");
        assert_eq!(fixture.league, "Premier League");
        assert_eq!(fixture.status, MatchStatus::Live);
        assert_eq!(fixture.home_score_ht, Some(1));
        assert_eq!(fixture.venue.as_deref(), Some("Old Trafford"));
        // Kick-off offsets are normalized to UTC
        assert_eq!(
            fixture.match_date,
            Utc.with_ymd_and_hms(2026, 10, 19, 19, 0, 0).unwrap()
        );
        // Live fixtures carry no final score
        assert_eq!(fixture.final_score(), None);
    }

    #[test]
    fn test_rapidapi_host_from_base_url() {
        let client =
            ApiFootballClient::new("https://api-football-v1.p.rapidapi.com/v3", "key").unwrap();
        assert_eq!(client.host, "api-football-v1.p.rapidapi.com");
    }
}
