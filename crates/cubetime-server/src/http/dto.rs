//! JSON request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::competition::{
    AttemptSubmission, ClearReport, CompetitionError, IssuedSession, Leaderboard, RankedEntry,
    RawTime,
};
use crate::qr::QrPayload;
use crate::storage::{LeaderboardEntry, QrSession};

// === Requests ===

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrRequest {
    pub email: Option<String>,
    pub qr_data: Option<Value>,
}

impl GenerateQrRequest {
    pub fn into_parts(self) -> Result<(String, QrPayload), CompetitionError> {
        let required = || CompetitionError::malformed("Email and QR data are required");
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(required)?;
        let payload = match self.qr_data {
            None | Some(Value::Null) => return Err(required()),
            Some(value) => parse_qr_data(value)?,
        };
        Ok((email, payload))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateQrRequest {
    pub qr_data: Option<Value>,
    pub participant_id: Option<Value>,
    pub time: Option<RawTime>,
    pub participant_name: Option<String>,
    pub scramble: Option<String>,
}

impl ValidateQrRequest {
    pub fn into_submission(self) -> Result<AttemptSubmission, CompetitionError> {
        let payload = match self.qr_data {
            None | Some(Value::Null) => None,
            Some(value) => Some(parse_qr_data(value)?),
        };
        Ok(AttemptSubmission {
            payload,
            participant_id: self.participant_id.and_then(scalar_to_string),
            raw_time: self.time,
            participant_name: self.participant_name,
            scramble: self.scramble,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub session_id: Option<String>,
    pub admin_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEmailRequest {
    pub admin_email: Option<String>,
}

impl AdminEmailRequest {
    /// Parse a body that may be absent. An empty body is `None`; anything
    /// else must be valid JSON.
    pub fn from_optional_body(body: &[u8]) -> Result<Option<Self>, CompetitionError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| CompetitionError::malformed(format!("Invalid JSON body: {e}")))
    }
}

/// `qrData` arrives either as the decoded object or as the raw text read
/// off the code.
fn parse_qr_data(value: Value) -> Result<QrPayload, CompetitionError> {
    let parsed = match value {
        Value::String(text) => QrPayload::from_json(&text),
        other => QrPayload::from_value(other),
    };
    parsed.map_err(|_| CompetitionError::malformed("QR data must be a JSON object"))
}

/// Participant ids are accepted as strings or numbers.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// === Responses ===

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQrResponse {
    pub success: bool,
    pub message: &'static str,
    pub session_id: String,
    pub qr_data: QrPayload,
    pub qr_code_image: String,
    pub expires_at: i64,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_error: Option<String>,
}

impl From<IssuedSession> for GenerateQrResponse {
    fn from(issued: IssuedSession) -> Self {
        let message = if issued.notified {
            "QR code generated and sent successfully!"
        } else {
            "QR code generated successfully but email failed to send"
        };
        Self {
            success: true,
            message,
            qr_code_image: issued.qr.data_url(),
            session_id: issued.session_id,
            qr_data: issued.payload,
            expires_at: issued.expires_at,
            email_sent: issued.notified,
            email_error: issued.notification_error,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateQrResponse {
    pub success: bool,
    pub message: &'static str,
    pub admin_email: String,
    pub session_id: String,
    pub leaderboard_entry: EntryView,
}

impl From<LeaderboardEntry> for ValidateQrResponse {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            success: true,
            message: "QR code validated successfully and time recorded",
            admin_email: entry.admin_email.clone(),
            session_id: entry.session_id.clone(),
            leaderboard_entry: EntryView::new(entry, None),
        }
    }
}

/// A leaderboard row. `position` is `null` until the entry is read back
/// through a ranking query.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: i64,
    pub participant_name: String,
    pub participant_id: String,
    pub time_in_seconds: f64,
    pub session_id: String,
    pub admin_email: String,
    pub scramble: Option<String>,
    pub validated_at: i64,
    pub position: Option<u32>,
}

impl EntryView {
    fn new(entry: LeaderboardEntry, position: Option<u32>) -> Self {
        Self {
            id: entry.id,
            time_in_seconds: entry.time_in_seconds(),
            participant_name: entry.participant_name,
            participant_id: entry.participant_id,
            session_id: entry.session_id,
            admin_email: entry.admin_email,
            scramble: entry.scramble,
            validated_at: entry.validated_at,
            position,
        }
    }
}

impl From<RankedEntry> for EntryView {
    fn from(ranked: RankedEntry) -> Self {
        Self::new(ranked.entry, Some(ranked.position))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub success: bool,
    pub leaderboard: Vec<EntryView>,
    pub total_entries: usize,
    pub matching_entries: i64,
}

impl From<Leaderboard> for LeaderboardResponse {
    fn from(board: Leaderboard) -> Self {
        Self {
            success: true,
            total_entries: board.total_count(),
            matching_entries: board.matching_count,
            leaderboard: board.entries.into_iter().map(EntryView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedCounts {
    pub leaderboard_entries_removed: u64,
    pub sessions_deactivated: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearRecordsResponse {
    pub success: bool,
    pub message: &'static str,
    pub cleared: ClearedCounts,
}

impl From<ClearReport> for ClearRecordsResponse {
    fn from(report: ClearReport) -> Self {
        Self {
            success: true,
            message: "Records cleared successfully",
            cleared: ClearedCounts {
                leaderboard_entries_removed: report.leaderboard_entries_removed,
                sessions_deactivated: report.sessions_deactivated,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub admin_email: String,
    pub qr_data: Value,
    pub is_active: bool,
    pub expires_at: i64,
    pub created_at: i64,
}

impl From<QrSession> for SessionView {
    fn from(session: QrSession) -> Self {
        // Stored payloads were written by the issuer; fall back to the raw
        // text if one cannot be parsed.
        let qr_data = serde_json::from_str(&session.payload)
            .unwrap_or_else(|_| Value::String(session.payload.clone()));
        Self {
            session_id: session.session_id,
            admin_email: session.admin_email,
            qr_data,
            is_active: session.is_active,
            expires_at: session.expires_at,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub success: bool,
    pub sessions: Vec<SessionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminEmailsResponse {
    pub success: bool,
    pub admin_emails: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}
