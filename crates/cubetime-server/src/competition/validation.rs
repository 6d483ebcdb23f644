//! Validation Engine.
//!
//! Each submission makes a single pass through
//! `Received -> CheckingPayload -> CheckingSession -> CheckingExpiry ->
//! Committing` and ends accepted or rejected. Nothing is held between
//! requests. A session may authorize any number of attempts while it is
//! valid; reuse across participants is the normal case.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use cubetime_core::Clock;

use super::error::CompetitionError;
use crate::qr::QrPayload;
use crate::storage::{CompetitionDatabase, LeaderboardEntry, NewEntryParams, QrSession};

/// Largest accepted solve time, in seconds.
const MAX_TIME_SECS: f64 = 1_000_000.0;

/// A time as submitted by the client: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Seconds(f64),
    Text(String),
}

impl RawTime {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    /// Parse into whole milliseconds.
    pub fn to_millis(&self) -> Result<i64, CompetitionError> {
        let secs = match self {
            Self::Seconds(v) => *v,
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CompetitionError::malformed(format!("Invalid time value: {s:?}")))?,
        };
        if !secs.is_finite() || secs < 0.0 || secs > MAX_TIME_SECS {
            return Err(CompetitionError::malformed(format!(
                "Time must be a number of seconds between 0 and {MAX_TIME_SECS}"
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok((secs * 1000.0).round() as i64)
    }
}

/// One participant attempt presented for validation.
#[derive(Debug, Clone, Default)]
pub struct AttemptSubmission {
    pub payload: Option<QrPayload>,
    pub participant_id: Option<String>,
    pub raw_time: Option<RawTime>,
    pub participant_name: Option<String>,
    pub scramble: Option<String>,
}

/// An accepted attempt. Rank is not known at this point; see
/// [`super::RankingQuery`].
#[derive(Debug, Clone)]
pub struct ValidatedAttempt {
    pub entry: LeaderboardEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    Received,
    CheckingPayload,
    CheckingSession,
    CheckingExpiry,
    Committing,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::CheckingPayload => "checking_payload",
            Self::CheckingSession => "checking_session",
            Self::CheckingExpiry => "checking_expiry",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Fields that survived payload checking.
struct CheckedAttempt {
    session_id: String,
    participant_id: String,
    raw_time: RawTime,
    participant_name: Option<String>,
    scramble: Option<String>,
}

pub struct ValidationEngine {
    db: CompetitionDatabase,
    clock: Arc<dyn Clock>,
}

impl ValidationEngine {
    pub fn new(db: CompetitionDatabase, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Validate a submission against its session and record it.
    #[instrument(skip(self, submission), fields(op = "validate_and_record"))]
    pub async fn validate_and_record(
        &self,
        submission: AttemptSubmission,
    ) -> Result<ValidatedAttempt, CompetitionError> {
        let mut stage = ValidationStage::Received;
        let result = self.run(submission, &mut stage).await;
        if let Err(e) = &result {
            debug!(stage = %stage, code = e.code(), "Attempt rejected");
        }
        result
    }

    async fn run(
        &self,
        submission: AttemptSubmission,
        stage: &mut ValidationStage,
    ) -> Result<ValidatedAttempt, CompetitionError> {
        *stage = ValidationStage::CheckingPayload;
        let attempt = check_payload(submission)?;

        *stage = ValidationStage::CheckingSession;
        let session = self
            .db
            .find_active_session(&attempt.session_id)
            .await?
            .ok_or(CompetitionError::InvalidSession)?;

        *stage = ValidationStage::CheckingExpiry;
        let now = self.clock.now_secs();
        self.check_expiry(&session, now).await?;

        *stage = ValidationStage::Committing;
        let time_millis = attempt.raw_time.to_millis()?;
        let participant_name = attempt
            .participant_name
            .unwrap_or_else(|| format!("Participant {}", attempt.participant_id));

        // Attribution comes from the stored session, never from the
        // email the client put in the payload.
        let entry = self
            .db
            .insert_entry(&NewEntryParams {
                participant_name: &participant_name,
                participant_id: &attempt.participant_id,
                time_millis,
                session_id: &attempt.session_id,
                admin_email: &session.admin_email,
                scramble: attempt.scramble.as_deref(),
                now,
            })
            .await?;

        info!(
            entry_id = entry.id,
            session_id = %entry.session_id,
            participant_id = %entry.participant_id,
            time_millis,
            "Attempt validated"
        );

        Ok(ValidatedAttempt { entry })
    }

    /// Expired sessions are switched off the first time they are used. Only
    /// the attempt whose write flips the row reports the expiry; a concurrent
    /// attempt that lost the race sees an inactive session.
    async fn check_expiry(&self, session: &QrSession, now: i64) -> Result<(), CompetitionError> {
        if !session.is_expired_at(now) {
            return Ok(());
        }
        if !self.db.expire_session(&session.session_id, now).await? {
            return Err(CompetitionError::InvalidSession);
        }
        info!(
            session_id = %session.session_id,
            expires_at = session.expires_at,
            "Session expired"
        );
        Err(CompetitionError::SessionExpired)
    }
}

fn check_payload(submission: AttemptSubmission) -> Result<CheckedAttempt, CompetitionError> {
    let required = || CompetitionError::malformed("QR data, participant ID, and time are required");

    let payload = submission.payload.ok_or_else(required)?;
    let participant_id = non_blank(submission.participant_id).ok_or_else(required)?;
    let raw_time = submission
        .raw_time
        .filter(|t| !t.is_blank())
        .ok_or_else(required)?;

    if !payload.is_admin_session() {
        return Err(CompetitionError::malformed("Invalid QR code type"));
    }
    let session_id = payload
        .session_id()
        .map(String::from)
        .ok_or_else(|| CompetitionError::malformed("QR data is missing a session ID"))?;

    Ok(CheckedAttempt {
        session_id,
        participant_id,
        raw_time,
        participant_name: non_blank(submission.participant_name),
        scramble: non_blank(submission.scramble),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_strings() {
        assert_eq!(RawTime::Text("12.34".into()).to_millis().unwrap(), 12_340);
        assert_eq!(RawTime::Text(" 9.87 ".into()).to_millis().unwrap(), 9_870);
        assert_eq!(RawTime::Seconds(15.0).to_millis().unwrap(), 15_000);
        assert_eq!(RawTime::Seconds(0.0).to_millis().unwrap(), 0);
        assert_eq!(RawTime::Text("7.0006".into()).to_millis().unwrap(), 7_001);
    }

    #[test]
    fn rejects_unusable_times() {
        for bad in ["abc", "-1", "NaN", "inf", "1e12", ""] {
            assert!(RawTime::Text(bad.into()).to_millis().is_err(), "{bad}");
        }
        assert!(RawTime::Seconds(-0.5).to_millis().is_err());
    }

    #[test]
    fn raw_time_deserializes_from_number_or_string() {
        let n: RawTime = serde_json::from_str("12.5").unwrap();
        assert_eq!(n, RawTime::Seconds(12.5));
        let s: RawTime = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(s, RawTime::Text("12.5".into()));
    }

    #[test]
    fn payload_check_requires_fields() {
        let payload = QrPayload::admin_session("s1", "a@x.com", 1);
        let base = AttemptSubmission {
            payload: Some(payload),
            participant_id: Some("p1".into()),
            raw_time: Some(RawTime::Text("1".into())),
            ..AttemptSubmission::default()
        };
        assert!(check_payload(base.clone()).is_ok());

        let mut missing = base.clone();
        missing.participant_id = Some("  ".into());
        assert!(check_payload(missing).is_err());

        let mut missing = base.clone();
        missing.raw_time = Some(RawTime::Text(String::new()));
        assert!(check_payload(missing).is_err());

        let mut wrong_type = base;
        wrong_type.payload.as_mut().unwrap().kind = Some("participant".into());
        let err = check_payload(wrong_type).err().unwrap();
        assert_eq!(err.to_string(), "Invalid QR code type");
    }
}
