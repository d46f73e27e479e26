use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::info;

use super::{connect, convert_rows, format_timestamp, require_timestamp};
use crate::models::{Fixture, MatchInput, MatchStatus};
use crate::predictor::MatchSource;

/// SQLite store for fetched fixtures
pub struct MatchStore {
    pool: Pool<Sqlite>,
}

impl MatchStore {
    /// Create a new match store and initialize the database
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = connect(database_url).await?;

        let store = Self { pool };
        store.init_schema().await?;

        info!("Match store initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id_api TEXT UNIQUE NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                match_date TEXT NOT NULL,
                league TEXT NOT NULL,
                competition_code TEXT,
                status TEXT NOT NULL,
                home_score INTEGER,
                away_score INTEGER,
                home_score_ht INTEGER,
                away_score_ht INTEGER,
                venue TEXT,
                referee TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create matches table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_matches_date
            ON matches (match_date)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_matches_status
            ON matches (status)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a fixture or refresh the stored copy with the same provider id
    pub async fn upsert_match(&self, fixture: &Fixture) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO matches (
                match_id_api,
                home_team,
                away_team,
                match_date,
                league,
                competition_code,
                status,
                home_score,
                away_score,
                home_score_ht,
                away_score_ht,
                venue,
                referee,
                updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(match_id_api) DO UPDATE SET
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                match_date = excluded.match_date,
                league = excluded.league,
                competition_code = excluded.competition_code,
                status = excluded.status,
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                home_score_ht = excluded.home_score_ht,
                away_score_ht = excluded.away_score_ht,
                venue = excluded.venue,
                referee = excluded.referee,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&fixture.match_id_api)
        .bind(&fixture.home_team)
        .bind(&fixture.away_team)
        .bind(format_timestamp(&fixture.match_date))
        .bind(&fixture.league)
        .bind(&fixture.competition_code)
        .bind(fixture.status.as_str())
        .bind(fixture.home_score)
        .bind(fixture.away_score)
        .bind(fixture.home_score_ht)
        .bind(fixture.away_score_ht)
        .bind(&fixture.venue)
        .bind(&fixture.referee)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert match {}", fixture.match_id_api))?;

        Ok(())
    }

    /// Fixtures kicking off in `[from, to)`, earliest first
    pub async fn get_matches_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Fixture>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT * FROM matches
            WHERE match_date >= ? AND match_date < ?
            ORDER BY match_date ASC, match_id_api ASC
            "#,
        )
        .bind(format_timestamp(&from))
        .bind(format_timestamp(&to))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch matches")?;

        Ok(convert_rows(rows))
    }

    /// Finished fixtures with a full-time score, most recent first
    pub async fn get_finished_matches(&self, limit: i64) -> Result<Vec<Fixture>> {
        let rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT * FROM matches
            WHERE status = 'finished'
              AND home_score IS NOT NULL
              AND away_score IS NOT NULL
            ORDER BY match_date DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch finished matches")?;

        Ok(convert_rows(rows))
    }

    pub async fn get_match(&self, match_id_api: &str) -> Result<Option<Fixture>> {
        let row = sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE match_id_api = ?")
            .bind(match_id_api)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch match")?;

        Ok(row.and_then(|r| convert_rows(vec![r]).pop()))
    }

    pub async fn get_count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matches")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count matches")?;

        Ok(row.0)
    }
}

#[async_trait]
impl MatchSource for MatchStore {
    /// Scheduled or live fixtures in the range
    async fn fetch_candidate_matches(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MatchInput>> {
        let fixtures = self.get_matches_between(from, to).await?;
        Ok(fixtures
            .iter()
            .filter(|f| matches!(f.status, MatchStatus::Scheduled | MatchStatus::Live))
            .map(Fixture::to_match_input)
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct MatchRow {
    match_id_api: String,
    home_team: String,
    away_team: String,
    match_date: String,
    league: String,
    competition_code: Option<String>,
    status: String,
    home_score: Option<i32>,
    away_score: Option<i32>,
    home_score_ht: Option<i32>,
    away_score_ht: Option<i32>,
    venue: Option<String>,
    referee: Option<String>,
}

impl TryFrom<MatchRow> for Fixture {
    type Error = anyhow::Error;

    fn try_from(row: MatchRow) -> Result<Self> {
        Ok(Fixture {
            match_id_api: row.match_id_api,
            home_team: row.home_team,
            away_team: row.away_team,
            match_date: require_timestamp(&row.match_date, "match_date")?,
            league: row.league,
            competition_code: row.competition_code,
            status: MatchStatus::parse(&row.status),
            home_score: row.home_score,
            away_score: row.away_score,
            home_score_ht: row.home_score_ht,
            away_score_ht: row.away_score_ht,
            venue: row.venue,
            referee: row.referee,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::db::temp_database_url;

    fn fixture(id: &str, home: &str, away: &str, kickoff: DateTime<Utc>) -> Fixture {
        Fixture {
            match_id_api: id.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            match_date: kickoff,
            league: "Ligue 1".to_string(),
            competition_code: Some("FL1".to_string()),
            status: MatchStatus::Scheduled,
            home_score: None,
            away_score: None,
            home_score_ht: None,
            away_score_ht: None,
            venue: Some("Parc des Princes".to_string()),
            referee: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_match() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(&temp_database_url(&dir)).await.unwrap();
        let kickoff = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();

        let mut psg = fixture("fd-1", "PSG", "Marseille", kickoff);
        store.upsert_match(&psg).await.unwrap();

        psg.status = MatchStatus::Finished;
        psg.home_score = Some(2);
        psg.away_score = Some(2);
        store.upsert_match(&psg).await.unwrap();

        assert_eq!(store.get_count().await.unwrap(), 1);
        let stored = store.get_match("fd-1").await.unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Finished);
        assert_eq!(stored.final_score(), Some((2, 2)));
        assert_eq!(stored.match_date, kickoff);
        assert_eq!(stored.venue.as_deref(), Some("Parc des Princes"));

        assert!(store.get_match("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_candidates_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = MatchStore::new(&temp_database_url(&dir)).await.unwrap();
        let today = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

        store
            .upsert_match(&fixture("a", "PSG", "Marseille", today + Duration::hours(20)))
            .await
            .unwrap();
        store
            .upsert_match(&fixture("b", "Lyon", "Nice", today + Duration::hours(15)))
            .await
            .unwrap();
        store
            .upsert_match(&fixture("c", "Lens", "Lille", today + Duration::days(5)))
            .await
            .unwrap();
        let mut done = fixture("d", "Rennes", "Brest", today + Duration::hours(12));
        done.status = MatchStatus::Finished;
        done.home_score = Some(1);
        done.away_score = Some(0);
        store.upsert_match(&done).await.unwrap();

        let candidates = store
            .fetch_candidate_matches(today, today + Duration::days(1))
            .await
            .unwrap();
        let ids: Vec<&str> = candidates.iter().map(|m| m.match_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(candidates.iter().all(|m| m.match_date.is_some()));

        let finished = store.get_finished_matches(10).await.unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].match_id_api, "d");
    }
}
