//! Data models for `CubeTime` storage.

use serde::{Deserialize, Serialize};

/// An admin-issued validation window.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QrSession {
    pub id: i64,
    pub session_id: String,
    pub admin_email: String,
    /// The JSON text that was encoded into the QR image.
    pub payload: String,
    pub is_active: bool,
    pub expires_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl QrSession {
    /// A session may authorize attempts while active and not past its expiry.
    pub const fn is_valid_at(&self, now: i64) -> bool {
        self.is_active && now <= self.expires_at
    }

    pub const fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// One validated attempt.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub participant_name: String,
    pub participant_id: String,
    /// Elapsed time in whole milliseconds (seconds to three decimal places).
    pub time_millis: i64,
    pub session_id: String,
    pub admin_email: String,
    pub scramble: Option<String>,
    pub validated_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl LeaderboardEntry {
    #[allow(clippy::cast_precision_loss)]
    pub fn time_in_seconds(&self) -> f64 {
        self.time_millis as f64 / 1000.0
    }
}
