//! Shared test helpers for competition service tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use cubetime_core::{Config, ManualClock};

use super::Competition;
use crate::notifications::{NotificationError, Notifier, SessionNotice};
use crate::qr::SvgQrCodec;
use crate::storage::CompetitionDatabase;

/// Fixed start time for tests (2025-10-09T08:53:20Z).
pub const NOW: i64 = 1_760_000_000;

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SessionNotice>>,
}

impl RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<SessionNotice> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    async fn notify_session_issued(&self, notice: &SessionNotice) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

/// Notifier whose delivery always fails.
pub struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn notify_session_issued(
        &self,
        _notice: &SessionNotice,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::ApiError {
            status: 503,
            body: "mail relay down".into(),
        })
    }
}

pub struct Harness {
    pub competition: Competition,
    pub db: CompetitionDatabase,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config(admins: &[&str]) -> Config {
    let mut config = Config::default();
    config.admins.emails = admins.iter().map(|a| (*a).to_string()).collect();
    config
}

/// Services over an in-memory database with admins `a@x.com` and `b@x.com`.
pub async fn setup() -> Harness {
    setup_with(Arc::new(RecordingNotifier::default()), None).await
}

#[allow(clippy::unwrap_used)]
pub async fn setup_with(
    notifier: Arc<RecordingNotifier>,
    failing: Option<Arc<FailingNotifier>>,
) -> Harness {
    let db = CompetitionDatabase::open_in_memory().await.unwrap();
    harness(db, notifier, failing)
}

/// Services over a file-backed database, so the multi-connection WAL pool
/// is in play.
#[allow(clippy::unwrap_used)]
pub async fn setup_on_disk(dir: &Path) -> Harness {
    let db = CompetitionDatabase::open(&dir.join("cubetime.db"))
        .await
        .unwrap();
    harness(db, Arc::new(RecordingNotifier::default()), None)
}

fn harness(
    db: CompetitionDatabase,
    notifier: Arc<RecordingNotifier>,
    failing: Option<Arc<FailingNotifier>>,
) -> Harness {
    let clock = Arc::new(ManualClock::at_secs(NOW));
    let config = test_config(&["a@x.com", "B@x.com"]);
    let active: Arc<dyn Notifier> = match failing {
        Some(f) => f,
        None => notifier.clone(),
    };
    let competition = Competition::new(
        &db,
        &config,
        Arc::new(SvgQrCodec::default()),
        active,
        clock.clone(),
    );
    Harness {
        competition,
        db,
        clock,
        notifier,
    }
}
