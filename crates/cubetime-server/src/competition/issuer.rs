//! Session Issuer: admin-facing creation of QR validation sessions.

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::{info, instrument, warn};

use cubetime_core::{AdminAllowList, Clock};

use super::error::{CompetitionError, authorize_admin};
use crate::notifications::{Notifier, SessionNotice};
use crate::qr::{ADMIN_SESSION_TYPE, EncodedQr, QrCodec, QrError, QrPayload};
use crate::storage::{CompetitionDatabase, NewSessionParams, QrSession};

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: String,
    pub payload: QrPayload,
    pub qr: EncodedQr,
    pub expires_at: i64,
    /// Whether the admin was emailed the code.
    pub notified: bool,
    pub notification_error: Option<String>,
}

pub struct SessionIssuer {
    db: CompetitionDatabase,
    admins: Arc<AdminAllowList>,
    codec: Arc<dyn QrCodec>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ttl_secs: i64,
}

impl SessionIssuer {
    pub fn new(
        db: CompetitionDatabase,
        admins: Arc<AdminAllowList>,
        codec: Arc<dyn QrCodec>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        ttl_secs: i64,
    ) -> Self {
        Self {
            db,
            admins,
            codec,
            notifier,
            clock,
            ttl_secs,
        }
    }

    /// Issue a session for `admin_email`.
    ///
    /// A `sessionId` already present in `requested` is reused; issuing the
    /// same id twice for the same admin returns the stored session.
    #[instrument(skip(self, requested), fields(op = "issue_session"))]
    pub async fn issue_session(
        &self,
        admin_email: &str,
        requested: QrPayload,
    ) -> Result<IssuedSession, CompetitionError> {
        let admin = authorize_admin(&self.admins, admin_email)?;

        if requested.kind.as_deref().is_some_and(|k| k != ADMIN_SESSION_TYPE) {
            return Err(CompetitionError::malformed(format!(
                "QR payload type must be \"{ADMIN_SESSION_TYPE}\""
            )));
        }

        let now_millis = self.clock.now_millis();
        let session_id = requested
            .session_id()
            .map_or_else(|| generate_session_id(now_millis), String::from);

        let session = match self.db.find_session(&session_id).await? {
            Some(existing) => self.reuse(existing, &admin)?,
            None => self.create(&session_id, &admin, requested, now_millis).await?,
        };

        let payload = QrPayload::from_json(&session.payload)?;
        let qr = self.codec.encode(&payload)?;

        let notice = SessionNotice {
            admin_email: admin.clone(),
            session_id: session_id.clone(),
            issued_at_millis: payload.timestamp.unwrap_or(now_millis),
            expires_at: session.expires_at,
            qr: qr.clone(),
        };
        let delivery = self.notifier.notify_session_issued(&notice).await;
        let (notified, notification_error) = match delivery {
            Ok(()) => (true, None),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Session notification failed");
                (false, Some(e.to_string()))
            }
        };

        info!(session_id = %session_id, admin = %admin, notified, "Session issued");

        Ok(IssuedSession {
            session_id,
            payload,
            qr,
            expires_at: session.expires_at,
            notified,
            notification_error,
        })
    }

    fn reuse(&self, existing: QrSession, admin: &str) -> Result<QrSession, CompetitionError> {
        if existing.admin_email != admin {
            return Err(CompetitionError::malformed("Session ID is already in use"));
        }
        if !existing.is_valid_at(self.clock.now_secs()) {
            return Err(CompetitionError::malformed(
                "Session ID belongs to an inactive or expired session",
            ));
        }
        info!(session_id = %existing.session_id, "Reusing existing session");
        Ok(existing)
    }

    async fn create(
        &self,
        session_id: &str,
        admin: &str,
        requested: QrPayload,
        now_millis: i64,
    ) -> Result<QrSession, CompetitionError> {
        let payload = QrPayload {
            kind: Some(ADMIN_SESSION_TYPE.to_string()),
            session_id: Some(session_id.to_string()),
            email: Some(admin.to_string()),
            timestamp: Some(requested.timestamp.unwrap_or(now_millis)),
            extra: requested.extra,
        };

        // Render once up front so an unencodable payload is rejected before
        // anything is stored.
        self.codec.encode(&payload).map_err(|e| match e {
            QrError::Render(msg) => {
                CompetitionError::malformed(format!("QR payload cannot be encoded: {msg}"))
            }
            other => other.into(),
        })?;

        let now = now_millis.div_euclid(1000);
        let text = payload.to_json()?;
        let created = self
            .db
            .create_session(&NewSessionParams {
                session_id,
                admin_email: admin,
                payload: &text,
                expires_at: now + self.ttl_secs,
                now,
            })
            .await;

        match created {
            Ok(session) => Ok(session),
            // Lost a race with a concurrent retry using the same id.
            Err(e) => match self.db.find_session(session_id).await? {
                Some(existing) => self.reuse(existing, admin),
                None => Err(e.into()),
            },
        }
    }
}

/// `session_<millis>_<rand9>_<rand9>`: a time component plus two random
/// base-36 components.
pub fn generate_session_id(now_millis: i64) -> String {
    let mut rng = rand::thread_rng();
    let mut part = || -> String {
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect()
    };
    let first = part();
    let second = part();
    format!("session_{now_millis}_{first}_{second}")
}
