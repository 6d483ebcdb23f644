//! Failure taxonomy shared by the competition services.

use cubetime_core::AdminAllowList;
use cubetime_core::db::DatabaseError;

use crate::qr::QrError;

#[derive(Debug, thiserror::Error)]
pub enum CompetitionError {
    /// The actor is not on the admin allow-list. The list is disclosed so a
    /// legitimate admin can spot a typo in their address.
    #[error("Unauthorized: email not authorized for admin access")]
    Unauthorized { allowed: Vec<String> },

    #[error("{0}")]
    MalformedRequest(String),

    /// Unknown or inactive session. The two causes are reported identically
    /// so that session ids cannot be enumerated.
    #[error("Invalid or inactive QR session")]
    InvalidSession,

    #[error("QR session has expired")]
    SessionExpired,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompetitionError {
    /// Stable machine-readable code for the failure kind.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::MalformedRequest(_) => "malformed_request",
            Self::InvalidSession => "invalid_session",
            Self::SessionExpired => "session_expired",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }
}

impl From<DatabaseError> for CompetitionError {
    fn from(e: DatabaseError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<QrError> for CompetitionError {
    fn from(e: QrError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Check an admin address against the allow-list and return its normalised
/// (trimmed, lower-cased) form.
pub fn authorize_admin(admins: &AdminAllowList, email: &str) -> Result<String, CompetitionError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CompetitionError::malformed("Admin email is required"));
    }
    if !admins.contains(email) {
        return Err(CompetitionError::Unauthorized {
            allowed: admins.emails(),
        });
    }
    Ok(email.to_lowercase())
}
