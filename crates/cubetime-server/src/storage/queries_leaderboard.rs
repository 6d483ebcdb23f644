//! Leaderboard Store queries.

use super::db::CompetitionDatabase;
use super::models::LeaderboardEntry;
use cubetime_core::db::DatabaseError;

/// Parameters for recording a validated attempt.
pub struct NewEntryParams<'a> {
    pub participant_name: &'a str,
    pub participant_id: &'a str,
    pub time_millis: i64,
    pub session_id: &'a str,
    pub admin_email: &'a str,
    pub scramble: Option<&'a str>,
    pub now: i64,
}

/// Equality filter over the leaderboard. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaderboardFilter<'a> {
    pub session_id: Option<&'a str>,
    pub admin_email: Option<&'a str>,
}

impl CompetitionDatabase {
    /// Insert a validated attempt and return the stored row.
    pub async fn insert_entry(
        &self,
        params: &NewEntryParams<'_>,
    ) -> Result<LeaderboardEntry, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO leaderboard (participant_name, participant_id, time_millis, session_id, admin_email, scramble, validated_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.participant_name)
        .bind(params.participant_id)
        .bind(params.time_millis)
        .bind(params.session_id)
        .bind(params.admin_email)
        .bind(params.scramble)
        .bind(params.now)
        .bind(params.now)
        .bind(params.now)
        .execute(self.pool())
        .await?;

        self.get_entry(result.last_insert_rowid()).await
    }

    /// Get an entry by ID.
    pub async fn get_entry(&self, id: i64) -> Result<LeaderboardEntry, DatabaseError> {
        sqlx::query_as::<_, LeaderboardEntry>("SELECT * FROM leaderboard WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Leaderboard entry {id}")))
    }

    /// Matching entries, fastest first. Equal times keep insertion order.
    pub async fn query_leaderboard(
        &self,
        filter: LeaderboardFilter<'_>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT * FROM leaderboard WHERE (?1 IS NULL OR session_id = ?1) AND (?2 IS NULL OR admin_email = ?2) ORDER BY time_millis ASC, id ASC LIMIT ?3",
        )
        .bind(filter.session_id)
        .bind(filter.admin_email)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }

    /// Count matching entries, ignoring any display cap.
    pub async fn count_entries(&self, filter: LeaderboardFilter<'_>) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM leaderboard WHERE (?1 IS NULL OR session_id = ?1) AND (?2 IS NULL OR admin_email = ?2)",
        )
        .bind(filter.session_id)
        .bind(filter.admin_email)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0)
    }

    /// Remove every entry attributed to an admin.
    pub async fn delete_admin_entries(&self, admin_email: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM leaderboard WHERE admin_email = ?")
            .bind(admin_email)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
