//! Ranking Query: the leaderboard read path.
//!
//! Positions are derived from the sort on every call and never stored.

use tracing::instrument;

use super::error::CompetitionError;
use crate::storage::{CompetitionDatabase, LeaderboardEntry, LeaderboardFilter};

#[derive(Debug, Clone)]
pub struct RankedEntry {
    /// 1-based rank within this query's result.
    pub position: u32,
    pub entry: LeaderboardEntry,
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    pub entries: Vec<RankedEntry>,
    /// Number of matching entries before the display cap.
    pub matching_count: i64,
}

impl Leaderboard {
    /// Number of entries returned.
    pub fn total_count(&self) -> usize {
        self.entries.len()
    }
}

pub struct RankingQuery {
    db: CompetitionDatabase,
    max_entries: u32,
}

impl RankingQuery {
    pub const fn new(db: CompetitionDatabase, max_entries: u32) -> Self {
        Self { db, max_entries }
    }

    /// Fastest entries first, optionally restricted to a session and/or an
    /// admin. Blank filters are ignored.
    #[instrument(skip(self), fields(op = "get_leaderboard"))]
    pub async fn get_leaderboard(
        &self,
        session_id: Option<&str>,
        admin_email: Option<&str>,
    ) -> Result<Leaderboard, CompetitionError> {
        let admin_email = admin_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase);
        let filter = LeaderboardFilter {
            session_id: session_id.map(str::trim).filter(|s| !s.is_empty()),
            admin_email: admin_email.as_deref(),
        };

        let rows = self.db.query_leaderboard(filter, self.max_entries).await?;
        let matching_count = self.db.count_entries(filter).await?;

        let entries = (1u32..)
            .zip(rows)
            .map(|(position, entry)| RankedEntry { position, entry })
            .collect();

        Ok(Leaderboard {
            entries,
            matching_count,
        })
    }
}
