//! Admin maintenance: bulk clear and session lifecycle queries.

use std::sync::Arc;

use tracing::{info, instrument};

use cubetime_core::{AdminAllowList, Clock};

use super::error::{CompetitionError, authorize_admin};
use crate::storage::{CompetitionDatabase, QrSession};

/// Rows affected by [`AdminConsole::clear_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearReport {
    pub leaderboard_entries_removed: u64,
    pub sessions_deactivated: u64,
}

pub struct AdminConsole {
    db: CompetitionDatabase,
    admins: Arc<AdminAllowList>,
    clock: Arc<dyn Clock>,
}

impl AdminConsole {
    pub fn new(
        db: CompetitionDatabase,
        admins: Arc<AdminAllowList>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, admins, clock }
    }

    /// Configured admin addresses.
    pub fn admin_emails(&self) -> Vec<String> {
        self.admins.emails()
    }

    /// Delete the admin's leaderboard entries and switch off their sessions.
    /// Sessions are kept for the record.
    #[instrument(skip(self), fields(op = "clear_records"))]
    pub async fn clear_records(&self, admin_email: &str) -> Result<ClearReport, CompetitionError> {
        let admin = authorize_admin(&self.admins, admin_email)?;
        let now = self.clock.now_secs();

        let leaderboard_entries_removed = self.db.delete_admin_entries(&admin).await?;
        let sessions_deactivated = self.db.deactivate_admin_sessions(&admin, now).await?;

        info!(
            admin = %admin,
            leaderboard_entries_removed,
            sessions_deactivated,
            "Records cleared"
        );

        Ok(ClearReport {
            leaderboard_entries_removed,
            sessions_deactivated,
        })
    }

    /// The admin's usable sessions, newest first.
    #[instrument(skip(self), fields(op = "list_active_sessions"))]
    pub async fn list_active_sessions(
        &self,
        admin_email: &str,
    ) -> Result<Vec<QrSession>, CompetitionError> {
        let admin = authorize_admin(&self.admins, admin_email)?;
        Ok(self
            .db
            .list_active_sessions(&admin, self.clock.now_secs())
            .await?)
    }

    /// Switch a session off.
    ///
    /// With `requested_by` the session must belong to that admin; a session
    /// owned by someone else is reported as not found. Without it anyone
    /// holding the id may deactivate it.
    #[instrument(skip(self), fields(op = "deactivate_session"))]
    pub async fn deactivate_session(
        &self,
        session_id: &str,
        requested_by: Option<&str>,
    ) -> Result<(), CompetitionError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(CompetitionError::malformed("Session ID is required"));
        }
        let not_found = || CompetitionError::NotFound("Session".to_string());

        if let Some(requester) = requested_by.map(str::trim).filter(|r| !r.is_empty()) {
            let session = self.db.find_session(session_id).await?.ok_or_else(not_found)?;
            if !session.admin_email.eq_ignore_ascii_case(requester) {
                return Err(not_found());
            }
        }

        if !self
            .db
            .deactivate_session(session_id, self.clock.now_secs())
            .await?
        {
            return Err(not_found());
        }

        info!(session_id, "Session deactivated");
        Ok(())
    }
}
