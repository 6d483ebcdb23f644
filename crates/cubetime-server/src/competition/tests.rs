//! Tests for the competition services.

use std::sync::Arc;

use serde_json::json;

use super::test_helpers::{
    FailingNotifier, Harness, NOW, RecordingNotifier, setup, setup_on_disk, setup_with,
};
use super::{AttemptSubmission, CompetitionError, RawTime};
use crate::qr::{QrCodec, QrPayload, SvgQrCodec};

const DAY: i64 = 86_400;

fn attempt(payload: &QrPayload, participant: &str, time: &str) -> AttemptSubmission {
    AttemptSubmission {
        payload: Some(payload.clone()),
        participant_id: Some(participant.into()),
        raw_time: Some(RawTime::Text(time.into())),
        ..AttemptSubmission::default()
    }
}

async fn issue(h: &Harness, admin: &str, session_id: &str) -> QrPayload {
    let requested = QrPayload {
        session_id: Some(session_id.into()),
        ..QrPayload::default()
    };
    h.competition
        .issuer
        .issue_session(admin, requested)
        .await
        .unwrap()
        .payload
}

// === Session Issuer ===

#[tokio::test]
async fn issue_session_persists_and_notifies() {
    let h = setup().await;

    let issued = h
        .competition
        .issuer
        .issue_session("a@x.com", QrPayload::default())
        .await
        .unwrap();

    assert!(issued.session_id.starts_with("session_"));
    assert_eq!(issued.expires_at, NOW + DAY);
    assert!(issued.notified);
    assert!(issued.notification_error.is_none());

    assert!(issued.payload.is_admin_session());
    assert_eq!(issued.payload.session_id(), Some(issued.session_id.as_str()));
    assert_eq!(issued.payload.email.as_deref(), Some("a@x.com"));
    assert_eq!(issued.payload.timestamp, Some(NOW * 1000));

    let stored = h.db.get_session(&issued.session_id).await.unwrap();
    assert!(stored.is_active);
    assert_eq!(stored.admin_email, "a@x.com");
    assert_eq!(QrPayload::from_json(&stored.payload).unwrap(), issued.payload);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].session_id, issued.session_id);
    assert_eq!(sent[0].expires_at, NOW + DAY);
}

#[tokio::test]
async fn issued_qr_decodes_to_payload() {
    let h = setup().await;
    let mut requested = QrPayload::default();
    requested.extra.insert("event".into(), json!("3x3x3"));
    requested.timestamp = Some(1_234);

    let issued = h
        .competition
        .issuer
        .issue_session("a@x.com", requested)
        .await
        .unwrap();

    let decoded = SvgQrCodec::default().decode_text(&issued.qr.text).unwrap();
    assert_eq!(decoded, issued.payload);
    assert_eq!(decoded.extra["event"], "3x3x3");
    assert_eq!(decoded.timestamp, Some(1_234));
}

#[tokio::test]
async fn unauthorized_admin_creates_nothing() {
    let h = setup().await;

    let err = h
        .competition
        .issuer
        .issue_session("not-on-list@x.com", QrPayload::default())
        .await
        .unwrap_err();

    match err {
        CompetitionError::Unauthorized { allowed } => {
            assert_eq!(allowed, vec!["a@x.com", "b@x.com"]);
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM qr_sessions")
        .fetch_one(h.db.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn admin_email_match_is_case_insensitive() {
    let h = setup().await;
    let issued = h
        .competition
        .issuer
        .issue_session("b@X.COM", QrPayload::default())
        .await
        .unwrap();
    assert_eq!(h.db.get_session(&issued.session_id).await.unwrap().admin_email, "b@x.com");
}

#[tokio::test]
async fn client_chosen_session_id_is_idempotent() {
    let h = setup().await;

    let first = issue(&h, "a@x.com", "s1").await;
    h.clock.advance_secs(30);
    let second = issue(&h, "a@x.com", "s1").await;

    assert_eq!(first, second);
    assert_eq!(h.db.get_session("s1").await.unwrap().expires_at, NOW + DAY);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn session_id_owned_by_other_admin_is_rejected() {
    let h = setup().await;
    issue(&h, "a@x.com", "s1").await;

    let requested = QrPayload {
        session_id: Some("s1".into()),
        ..QrPayload::default()
    };
    let err = h
        .competition
        .issuer
        .issue_session("b@x.com", requested)
        .await
        .unwrap_err();
    assert!(matches!(err, CompetitionError::MalformedRequest(_)));
}

#[tokio::test]
async fn foreign_payload_type_is_rejected() {
    let h = setup().await;
    let requested = QrPayload {
        kind: Some("participant".into()),
        ..QrPayload::default()
    };
    let err = h
        .competition
        .issuer
        .issue_session("a@x.com", requested)
        .await
        .unwrap_err();
    assert!(matches!(err, CompetitionError::MalformedRequest(_)));
}

#[tokio::test]
async fn notification_failure_is_not_fatal() {
    let h = setup_with(
        Arc::new(RecordingNotifier::default()),
        Some(Arc::new(FailingNotifier)),
    )
    .await;

    let issued = h
        .competition
        .issuer
        .issue_session("a@x.com", QrPayload::default())
        .await
        .unwrap();

    assert!(!issued.notified);
    assert!(issued.notification_error.unwrap().contains("503"));

    // The session is usable regardless.
    let accepted = h
        .competition
        .validation
        .validate_and_record(attempt(&issued.payload, "p1", "10.00"))
        .await
        .unwrap();
    assert_eq!(accepted.entry.session_id, issued.session_id);
}

// === Validation Engine ===

#[tokio::test]
async fn scenario_a_records_validated_time() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;

    let accepted = h
        .competition
        .validation
        .validate_and_record(attempt(&payload, "p1", "12.34"))
        .await
        .unwrap();

    let entry = accepted.entry;
    assert_eq!(entry.time_millis, 12_340);
    assert_eq!(entry.admin_email, "a@x.com");
    assert_eq!(entry.session_id, "s1");
    assert_eq!(entry.participant_name, "Participant p1");
    assert!(entry.scramble.is_none());
    assert_eq!(entry.validated_at, NOW);
}

#[tokio::test]
async fn scenario_b_expiry_deactivates_once() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;

    // Exactly at the boundary the session is still valid.
    h.clock.advance_secs(DAY);
    h.competition
        .validation
        .validate_and_record(attempt(&payload, "p1", "10"))
        .await
        .unwrap();

    h.clock.advance_secs(1);
    let first = h
        .competition
        .validation
        .validate_and_record(attempt(&payload, "p2", "11"))
        .await
        .unwrap_err();
    assert!(matches!(first, CompetitionError::SessionExpired));
    assert!(!h.db.get_session("s1").await.unwrap().is_active);

    let second = h
        .competition
        .validation
        .validate_and_record(attempt(&payload, "p2", "11"))
        .await
        .unwrap_err();
    assert!(matches!(second, CompetitionError::InvalidSession));
}

/// Codes of a pair of results, sorted so the order of completion does not
/// matter.
fn outcome_codes<T>(results: [Result<T, CompetitionError>; 2]) -> Vec<&'static str> {
    let mut codes: Vec<&'static str> = results
        .iter()
        .map(|r| r.as_ref().map_or_else(CompetitionError::code, |_| "ok"))
        .collect();
    codes.sort_unstable();
    codes
}

#[tokio::test]
async fn concurrent_attempts_on_expired_session_expire_it_once() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;
    h.clock.advance_secs(DAY + 1);

    let (a, b) = tokio::join!(
        h.competition
            .validation
            .validate_and_record(attempt(&payload, "p1", "10")),
        h.competition
            .validation
            .validate_and_record(attempt(&payload, "p2", "11")),
    );

    assert_eq!(outcome_codes([a, b]), vec!["invalid_session", "session_expired"]);
    assert!(!h.db.get_session("s1").await.unwrap().is_active);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expiry_on_pooled_database() {
    let dir = tempfile::tempdir().unwrap();
    let h = Arc::new(setup_on_disk(dir.path()).await);
    let payload = issue(&h, "a@x.com", "s1").await;
    h.clock.advance_secs(DAY + 1);

    let spawn = |pid: &'static str| {
        let h = Arc::clone(&h);
        let payload = payload.clone();
        tokio::spawn(async move {
            h.competition
                .validation
                .validate_and_record(attempt(&payload, pid, "10"))
                .await
        })
    };
    let (a, b) = tokio::join!(spawn("p1"), spawn("p2"));

    assert_eq!(
        outcome_codes([a.unwrap(), b.unwrap()]),
        vec!["invalid_session", "session_expired"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_on_one_session_both_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let h = Arc::new(setup_on_disk(dir.path()).await);
    let payload = issue(&h, "a@x.com", "s1").await;

    let spawn = |pid: &'static str, time: &'static str| {
        let h = Arc::clone(&h);
        let payload = payload.clone();
        tokio::spawn(async move {
            h.competition
                .validation
                .validate_and_record(attempt(&payload, pid, time))
                .await
        })
    };
    let (a, b) = tokio::join!(spawn("p1", "12.34"), spawn("p2", "9.87"));
    let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
    assert_ne!(a.entry.id, b.entry.id);
    assert_eq!(a.entry.admin_email, "a@x.com");
    assert_eq!(b.entry.admin_email, "a@x.com");

    let board = h
        .competition
        .ranking
        .get_leaderboard(Some("s1"), None)
        .await
        .unwrap();
    let order: Vec<(&str, u32)> = board
        .entries
        .iter()
        .map(|r| (r.entry.participant_id.as_str(), r.position))
        .collect();
    assert_eq!(order, vec![("p2", 1), ("p1", 2)]);
}

#[tokio::test]
async fn attribution_comes_from_session() {
    let h = setup().await;
    let mut payload = issue(&h, "a@x.com", "s1").await;
    payload.email = Some("b@x.com".into());

    let accepted = h
        .competition
        .validation
        .validate_and_record(attempt(&payload, "p1", "9.5"))
        .await
        .unwrap();
    assert_eq!(accepted.entry.admin_email, "a@x.com");
}

#[tokio::test]
async fn unknown_session_is_invalid() {
    let h = setup().await;
    let payload = QrPayload::admin_session("forged", "a@x.com", NOW * 1000);

    let err = h
        .competition
        .validation
        .validate_and_record(attempt(&payload, "p1", "5"))
        .await
        .unwrap_err();
    assert!(matches!(err, CompetitionError::InvalidSession));
}

#[tokio::test]
async fn deactivated_and_unknown_sessions_look_the_same() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;
    h.competition.admin.deactivate_session("s1", None).await.unwrap();

    let inactive = h
        .competition
        .validation
        .validate_and_record(attempt(&payload, "p1", "5"))
        .await
        .unwrap_err();
    let unknown = h
        .competition
        .validation
        .validate_and_record(attempt(&QrPayload::admin_session("nope", "a@x.com", 0), "p1", "5"))
        .await
        .unwrap_err();
    assert_eq!(inactive.to_string(), unknown.to_string());
    assert_eq!(inactive.code(), unknown.code());
}

#[tokio::test]
async fn malformed_submissions_write_nothing() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;

    let missing_time = AttemptSubmission {
        payload: Some(payload.clone()),
        participant_id: Some("p1".into()),
        ..AttemptSubmission::default()
    };
    let unparsable = attempt(&payload, "p1", "fast");
    let mut wrong_type = attempt(&payload, "p1", "5");
    wrong_type.payload.as_mut().unwrap().kind = Some("other".into());

    for submission in [missing_time, unparsable, wrong_type] {
        let err = h
            .competition
            .validation
            .validate_and_record(submission)
            .await
            .unwrap_err();
        assert!(matches!(err, CompetitionError::MalformedRequest(_)), "{err:?}");
    }
    let board = h.competition.ranking.get_leaderboard(None, None).await.unwrap();
    assert_eq!(board.total_count(), 0);
}

#[tokio::test]
async fn session_is_reusable_and_submissions_are_not_deduplicated() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;

    let (a, b) = tokio::join!(
        h.competition
            .validation
            .validate_and_record(attempt(&payload, "p1", "10")),
        h.competition
            .validation
            .validate_and_record(attempt(&payload, "p2", "11")),
    );
    a.unwrap();
    b.unwrap();

    h.competition
        .validation
        .validate_and_record(attempt(&payload, "p1", "10"))
        .await
        .unwrap();

    let board = h.competition.ranking.get_leaderboard(Some("s1"), None).await.unwrap();
    assert_eq!(board.total_count(), 3);
}

#[tokio::test]
async fn name_and_scramble_are_kept() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;
    let mut submission = attempt(&payload, "p7", "21.5");
    submission.participant_name = Some("Feliks".into());
    submission.scramble = Some("R U R' U' F2".into());
    submission.raw_time = Some(RawTime::Seconds(21.5));

    let entry = h
        .competition
        .validation
        .validate_and_record(submission)
        .await
        .unwrap()
        .entry;
    assert_eq!(entry.participant_name, "Feliks");
    assert_eq!(entry.scramble.as_deref(), Some("R U R' U' F2"));
    assert_eq!(entry.time_millis, 21_500);
}

// === Ranking Query ===

#[tokio::test]
async fn scenario_c_orders_by_time() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;
    for (pid, time) in [("p1", "12.34"), ("p2", "9.87"), ("p3", "15.00")] {
        h.competition
            .validation
            .validate_and_record(attempt(&payload, pid, time))
            .await
            .unwrap();
    }

    let board = h.competition.ranking.get_leaderboard(None, None).await.unwrap();
    let ranked: Vec<(u32, i64)> = board
        .entries
        .iter()
        .map(|r| (r.position, r.entry.time_millis))
        .collect();
    assert_eq!(ranked, vec![(1, 9_870), (2, 12_340), (3, 15_000)]);
    assert_eq!(board.total_count(), 3);
}

#[tokio::test]
async fn faster_entry_shifts_positions() {
    let h = setup().await;
    let payload = issue(&h, "a@x.com", "s1").await;
    for (pid, time) in [("p1", "10"), ("p2", "20")] {
        h.competition
            .validation
            .validate_and_record(attempt(&payload, pid, time))
            .await
            .unwrap();
    }
    h.competition
        .validation
        .validate_and_record(attempt(&payload, "p3", "5"))
        .await
        .unwrap();

    let board = h.competition.ranking.get_leaderboard(None, None).await.unwrap();
    let order: Vec<(&str, u32)> = board
        .entries
        .iter()
        .map(|r| (r.entry.participant_id.as_str(), r.position))
        .collect();
    assert_eq!(order, vec![("p3", 1), ("p1", 2), ("p2", 3)]);
}

#[tokio::test]
async fn filters_rank_locally() {
    let h = setup().await;
    let s1 = issue(&h, "a@x.com", "s1").await;
    let s2 = issue(&h, "b@x.com", "s2").await;
    h.competition.validation.validate_and_record(attempt(&s1, "p1", "8")).await.unwrap();
    h.competition.validation.validate_and_record(attempt(&s2, "p2", "7")).await.unwrap();
    h.competition.validation.validate_and_record(attempt(&s2, "p3", "9")).await.unwrap();

    let only_b = h
        .competition
        .ranking
        .get_leaderboard(None, Some("B@X.com"))
        .await
        .unwrap();
    let ids: Vec<(&str, u32)> = only_b
        .entries
        .iter()
        .map(|r| (r.entry.participant_id.as_str(), r.position))
        .collect();
    assert_eq!(ids, vec![("p2", 1), ("p3", 2)]);

    let only_s1 = h.competition.ranking.get_leaderboard(Some("s1"), Some("")).await.unwrap();
    assert_eq!(only_s1.entries[0].position, 1);
    assert_eq!(only_s1.entries[0].entry.participant_id, "p1");

    let none = h
        .competition
        .ranking
        .get_leaderboard(Some("s1"), Some("b@x.com"))
        .await
        .unwrap();
    assert!(none.entries.is_empty());
}

// === Admin maintenance ===

#[tokio::test]
async fn clear_records_is_idempotent_and_scoped() {
    let h = setup().await;
    let s1 = issue(&h, "a@x.com", "s1").await;
    let s2 = issue(&h, "b@x.com", "s2").await;
    h.competition.validation.validate_and_record(attempt(&s1, "p1", "8")).await.unwrap();
    h.competition.validation.validate_and_record(attempt(&s1, "p2", "9")).await.unwrap();
    h.competition.validation.validate_and_record(attempt(&s2, "p3", "7")).await.unwrap();

    let first = h.competition.admin.clear_records("A@x.com").await.unwrap();
    assert_eq!(first.leaderboard_entries_removed, 2);
    assert_eq!(first.sessions_deactivated, 1);

    let second = h.competition.admin.clear_records("a@x.com").await.unwrap();
    assert_eq!(second.leaderboard_entries_removed, 0);
    assert_eq!(second.sessions_deactivated, 0);

    // Sessions are archived, not deleted; the other admin is untouched.
    assert!(!h.db.get_session("s1").await.unwrap().is_active);
    assert!(h.db.get_session("s2").await.unwrap().is_active);
    let board = h.competition.ranking.get_leaderboard(None, None).await.unwrap();
    assert_eq!(board.total_count(), 1);
    assert_eq!(board.entries[0].entry.admin_email, "b@x.com");
}

#[tokio::test]
async fn clear_records_requires_admin() {
    let h = setup().await;
    let err = h.competition.admin.clear_records("c@x.com").await.unwrap_err();
    assert!(matches!(err, CompetitionError::Unauthorized { .. }));
    let err = h.competition.admin.clear_records("").await.unwrap_err();
    assert!(matches!(err, CompetitionError::MalformedRequest(_)));
}

#[tokio::test]
async fn list_active_sessions_hides_expired_and_inactive() {
    let h = setup().await;
    issue(&h, "a@x.com", "old").await;
    h.clock.advance_secs(DAY / 2);
    issue(&h, "a@x.com", "newer").await;
    issue(&h, "a@x.com", "off").await;
    issue(&h, "b@x.com", "theirs").await;
    h.competition.admin.deactivate_session("off", None).await.unwrap();

    let sessions = h.competition.admin.list_active_sessions("a@x.com").await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["newer", "old"]);

    h.clock.advance_secs(DAY / 2 + 1);
    let sessions = h.competition.admin.list_active_sessions("a@x.com").await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["newer"]);

    let err = h.competition.admin.list_active_sessions("c@x.com").await.unwrap_err();
    assert!(matches!(err, CompetitionError::Unauthorized { .. }));
}

#[tokio::test]
async fn deactivate_session_without_owner_check() {
    let h = setup().await;
    issue(&h, "a@x.com", "s1").await;

    h.competition.admin.deactivate_session("s1", None).await.unwrap();
    assert!(!h.db.get_session("s1").await.unwrap().is_active);

    // Deactivating again is still an acknowledgement.
    h.competition.admin.deactivate_session("s1", None).await.unwrap();

    let err = h
        .competition
        .admin
        .deactivate_session("missing", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CompetitionError::NotFound(_)));
}

#[tokio::test]
async fn deactivate_session_with_owner_check() {
    let h = setup().await;
    issue(&h, "a@x.com", "s1").await;

    let err = h
        .competition
        .admin
        .deactivate_session("s1", Some("b@x.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, CompetitionError::NotFound(_)));
    assert!(h.db.get_session("s1").await.unwrap().is_active);

    h.competition
        .admin
        .deactivate_session("s1", Some("A@X.com"))
        .await
        .unwrap();
    assert!(!h.db.get_session("s1").await.unwrap().is_active);
}
