use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use crate::models::{Fixture, MatchStatus};

/// football-data.org accepts a single status filter per request
const LIVE_STATUSES: [&str; 2] = ["IN_PLAY", "PAUSED"];

/// Prefix keeping football-data.org ids apart from other providers
pub const ID_PREFIX: &str = "fd";

/// Client for the football-data.org v4 REST API
pub struct FootballDataClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdMatch {
    pub id: i64,
    pub utc_date: DateTime<Utc>,
    pub status: String,
    pub home_team: FdTeam,
    pub away_team: FdTeam,
    pub competition: Option<FdCompetition>,
    pub score: Option<FdScore>,
    pub venue: Option<String>,
    #[serde(default)]
    pub referees: Vec<FdReferee>,
}

/// Team names are null until a knockout tie is drawn
#[derive(Debug, Clone, Deserialize)]
pub struct FdTeam {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FdCompetition {
    pub name: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FdScore {
    pub full_time: Option<FdScoreLine>,
    pub half_time: Option<FdScoreLine>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FdScoreLine {
    pub home: Option<i32>,
    pub away: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FdReferee {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchesResponse {
    #[serde(default)]
    matches: Vec<FdMatch>,
}

#[derive(Debug, Deserialize)]
struct CompetitionsResponse {
    #[serde(default)]
    competitions: Vec<FdCompetition>,
}

impl FdMatch {
    /// Convert to a stored fixture. Matches without both team names are skipped.
    pub fn to_fixture(&self) -> Option<Fixture> {
        let home_team = self.home_team.name.clone()?;
        let away_team = self.away_team.name.clone()?;

        let full_time = self
            .score
            .as_ref()
            .and_then(|s| s.full_time)
            .unwrap_or_default();
        let half_time = self
            .score
            .as_ref()
            .and_then(|s| s.half_time)
            .unwrap_or_default();

        Some(Fixture {
            match_id_api: format!("{}-{}", ID_PREFIX, self.id),
            home_team,
            away_team,
            match_date: self.utc_date,
            league: self
                .competition
                .as_ref()
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            competition_code: self.competition.as_ref().and_then(|c| c.code.clone()),
            status: map_match_status(&self.status),
            home_score: full_time.home,
            away_score: full_time.away,
            home_score_ht: half_time.home,
            away_score_ht: half_time.away,
            venue: self.venue.clone(),
            referee: self.referees.first().and_then(|r| r.name.clone()),
        })
    }
}

/// Map a football-data.org status onto the stored lifecycle
pub fn map_match_status(status: &str) -> MatchStatus {
    match status {
        "SCHEDULED" | "TIMED" => MatchStatus::Scheduled,
        "IN_PLAY" | "PAUSED" | "AWAITING_PENALTIES" => MatchStatus::Live,
        "FINISHED" | "PENS" => MatchStatus::Finished,
        "POSTPONED" => MatchStatus::Postponed,
        "CANCELLED" | "SUSPENDED" => MatchStatus::Cancelled,
        _ => MatchStatus::Scheduled,
    }
}

impl FootballDataClient {
    /// Create a new football-data.org client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build HTTP client")?;

        if api_key.is_empty() {
            warn!("FOOTBALL_DATA_API_KEY is not set, requests will be rejected");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("X-Auth-Token", &self.api_key)
            .send()
            .await
            .context("Failed to reach football-data.org")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("football-data.org API error: {} - {}", status, text);
        }

        response
            .json()
            .await
            .context("Failed to parse football-data.org response")
    }

    /// Matches of the major competitions on one day
    pub async fn get_matches_by_date(&self, date: NaiveDate) -> Result<Vec<FdMatch>> {
        let day = date.format("%Y-%m-%d");
        let url = format!("{}/matches?dateFrom={}&dateTo={}", self.base_url, day, day);

        let response: MatchesResponse = self.get_json(&url).await?;
        Ok(response.matches)
    }

    /// Matches of one competition between two days, inclusive
    pub async fn get_competition_matches(
        &self,
        competition_code: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<FdMatch>> {
        let url = format!(
            "{}/competitions/{}/matches?dateFrom={}&dateTo={}",
            self.base_url,
            urlencoding::encode(competition_code),
            date_from.format("%Y-%m-%d"),
            date_to.format("%Y-%m-%d")
        );

        let response: MatchesResponse = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to fetch {} matches", competition_code))?;
        Ok(response.matches)
    }

    /// Matches currently in play or at half-time
    pub async fn get_live_matches(&self) -> Result<Vec<FdMatch>> {
        let mut live = Vec::new();

        for status in LIVE_STATUSES {
            let url = format!("{}/matches?status={}", self.base_url, status);
            match self.get_json::<MatchesResponse>(&url).await {
                Ok(response) => live.extend(response.matches),
                Err(e) => warn!("Failed to fetch {} matches: {:#}", status, e),
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Ok(live)
    }

    pub async fn get_competitions(&self) -> Result<Vec<FdCompetition>> {
        let url = format!("{}/competitions", self.base_url);

        let response: CompetitionsResponse = self.get_json(&url).await?;
        Ok(response.competitions)
    }
}
