//! The structured record encoded into an admin QR code.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::QrError;

/// Value of the `type` field for admin validation sessions.
pub const ADMIN_SESSION_TYPE: &str = "admin_session";

/// Wire form of a QR payload.
///
/// The named fields are the ones the server interprets. Anything else the
/// client put in the record is kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Address the client claims issued the session. Informational only;
    /// attribution always comes from the stored session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issuance time in Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QrPayload {
    /// A payload for a freshly issued admin session.
    pub fn admin_session(session_id: &str, email: &str, timestamp: i64) -> Self {
        Self {
            kind: Some(ADMIN_SESSION_TYPE.to_string()),
            session_id: Some(session_id.to_string()),
            email: Some(email.to_string()),
            timestamp: Some(timestamp),
            extra: Map::new(),
        }
    }

    pub fn is_admin_session(&self) -> bool {
        self.kind.as_deref() == Some(ADMIN_SESSION_TYPE)
    }

    /// The session id, if present and non-blank.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Parse a payload from an arbitrary JSON value (e.g. a request body
    /// field). Non-object values are rejected.
    pub fn from_value(value: Value) -> Result<Self, QrError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, QrError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, QrError> {
        Ok(serde_json::from_str(text)?)
    }
}
