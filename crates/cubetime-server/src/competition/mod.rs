//! Competition workflow: issuing QR sessions, validating attempts against
//! them, and ranking the results.

mod admin;
mod error;
mod issuer;
mod ranking;
mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests;

use std::sync::Arc;

use cubetime_core::{Clock, Config};

use crate::notifications::Notifier;
use crate::qr::QrCodec;
use crate::storage::CompetitionDatabase;

pub use admin::{AdminConsole, ClearReport};
pub use error::{CompetitionError, authorize_admin};
pub use issuer::{IssuedSession, SessionIssuer, generate_session_id};
pub use ranking::{Leaderboard, RankedEntry, RankingQuery};
pub use validation::{
    AttemptSubmission, RawTime, ValidatedAttempt, ValidationEngine, ValidationStage,
};

/// All competition services wired to one database.
pub struct Competition {
    pub issuer: SessionIssuer,
    pub validation: ValidationEngine,
    pub ranking: RankingQuery,
    pub admin: AdminConsole,
}

impl Competition {
    pub fn new(
        db: &CompetitionDatabase,
        config: &Config,
        codec: Arc<dyn QrCodec>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let admins = Arc::new(config.admins.allow_list());
        Self {
            issuer: SessionIssuer::new(
                db.clone(),
                Arc::clone(&admins),
                codec,
                notifier,
                Arc::clone(&clock),
                config.sessions.ttl_secs,
            ),
            validation: ValidationEngine::new(db.clone(), Arc::clone(&clock)),
            ranking: RankingQuery::new(db.clone(), config.leaderboard.max_entries),
            admin: AdminConsole::new(db.clone(), admins, clock),
        }
    }
}
