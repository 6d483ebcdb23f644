//! Session Store queries.

use super::db::CompetitionDatabase;
use super::models::QrSession;
use cubetime_core::db::DatabaseError;

/// Parameters for persisting a newly issued session.
pub struct NewSessionParams<'a> {
    pub session_id: &'a str,
    pub admin_email: &'a str,
    pub payload: &'a str,
    pub expires_at: i64,
    pub now: i64,
}

impl CompetitionDatabase {
    /// Create a new, active session.
    pub async fn create_session(
        &self,
        params: &NewSessionParams<'_>,
    ) -> Result<QrSession, DatabaseError> {
        sqlx::query(
            "INSERT INTO qr_sessions (session_id, admin_email, payload, is_active, expires_at, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(params.session_id)
        .bind(params.admin_email)
        .bind(params.payload)
        .bind(params.expires_at)
        .bind(params.now)
        .bind(params.now)
        .execute(self.pool())
        .await?;

        self.get_session(params.session_id).await
    }

    /// Get a session by its public identifier, active or not.
    pub async fn get_session(&self, session_id: &str) -> Result<QrSession, DatabaseError> {
        self.find_session(session_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Session {session_id}")))
    }

    pub async fn find_session(
        &self,
        session_id: &str,
    ) -> Result<Option<QrSession>, DatabaseError> {
        let session =
            sqlx::query_as::<_, QrSession>("SELECT * FROM qr_sessions WHERE session_id = ?")
                .bind(session_id)
                .fetch_optional(self.pool())
                .await?;

        Ok(session)
    }

    /// Find a session that is still flagged active. Expiry is not checked
    /// here; callers compare `expires_at` against their own clock.
    pub async fn find_active_session(
        &self,
        session_id: &str,
    ) -> Result<Option<QrSession>, DatabaseError> {
        let session = sqlx::query_as::<_, QrSession>(
            "SELECT * FROM qr_sessions WHERE session_id = ? AND is_active = 1",
        )
        .bind(session_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(session)
    }

    /// Mark a session inactive. Returns `false` if no such session exists.
    pub async fn deactivate_session(
        &self,
        session_id: &str,
        now: i64,
    ) -> Result<bool, DatabaseError> {
        let result =
            sqlx::query("UPDATE qr_sessions SET is_active = 0, updated_at = ? WHERE session_id = ?")
                .bind(now)
                .bind(session_id)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Switch off a session that is past `expires_at`.
    ///
    /// Only a row that is still active is updated, so among concurrent
    /// callers exactly one gets `true`.
    pub async fn expire_session(&self, session_id: &str, now: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE qr_sessions SET is_active = 0, updated_at = ? WHERE session_id = ? AND is_active = 1 AND expires_at < ?",
        )
        .bind(now)
        .bind(session_id)
        .bind(now)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark every currently active session of an admin inactive.
    pub async fn deactivate_admin_sessions(
        &self,
        admin_email: &str,
        now: i64,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE qr_sessions SET is_active = 0, updated_at = ? WHERE admin_email = ? AND is_active = 1",
        )
        .bind(now)
        .bind(admin_email)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Sessions of an admin that are active and not yet expired, newest first.
    pub async fn list_active_sessions(
        &self,
        admin_email: &str,
        now: i64,
    ) -> Result<Vec<QrSession>, DatabaseError> {
        let sessions = sqlx::query_as::<_, QrSession>(
            "SELECT * FROM qr_sessions WHERE admin_email = ? AND is_active = 1 AND expires_at > ? ORDER BY created_at DESC, id DESC",
        )
        .bind(admin_email)
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        Ok(sessions)
    }
}
