//! Route handlers. Each one unpacks the request, calls a single competition
//! operation and shapes the JSON reply.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use super::AppState;
use super::dto::{
    AdminEmailRequest, AdminEmailsResponse, ClearRecordsResponse, GenerateQrRequest,
    GenerateQrResponse, LeaderboardQuery, LeaderboardResponse, MessageResponse, SessionView,
    SessionsResponse, ValidateQrRequest, ValidateQrResponse,
};
use super::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `POST /api/admin/generate-qr`
pub async fn generate_qr(
    State(state): State<AppState>,
    body: Result<Json<GenerateQrRequest>, JsonRejection>,
) -> ApiResult<GenerateQrResponse> {
    let Json(req) = body?;
    let (email, payload) = req.into_parts()?;
    let issued = state.competition.issuer.issue_session(&email, payload).await?;
    Ok(Json(issued.into()))
}

/// `POST /api/admin/validate-qr`
pub async fn validate_qr(
    State(state): State<AppState>,
    body: Result<Json<ValidateQrRequest>, JsonRejection>,
) -> ApiResult<ValidateQrResponse> {
    let Json(req) = body?;
    let accepted = state
        .competition
        .validation
        .validate_and_record(req.into_submission()?)
        .await?;
    Ok(Json(accepted.entry.into()))
}

/// `GET /api/admin/leaderboard?sessionId=&adminEmail=`
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<LeaderboardResponse> {
    let board = state
        .competition
        .ranking
        .get_leaderboard(query.session_id.as_deref(), query.admin_email.as_deref())
        .await?;
    Ok(Json(board.into()))
}

/// `POST /api/admin/clear-records`
pub async fn clear_records(
    State(state): State<AppState>,
    body: Result<Json<AdminEmailRequest>, JsonRejection>,
) -> ApiResult<ClearRecordsResponse> {
    let Json(req) = body?;
    let admin = req.admin_email.unwrap_or_default();
    let report = state.competition.admin.clear_records(&admin).await?;
    Ok(Json(report.into()))
}

/// `GET /api/admin/sessions/{adminEmail}`
pub async fn active_sessions(
    State(state): State<AppState>,
    Path(admin_email): Path<String>,
) -> ApiResult<SessionsResponse> {
    let sessions = state
        .competition
        .admin
        .list_active_sessions(&admin_email)
        .await?;
    Ok(Json(SessionsResponse {
        success: true,
        sessions: sessions.into_iter().map(SessionView::from).collect(),
    }))
}

/// `PUT /api/admin/sessions/{sessionId}/deactivate`
///
/// The body is optional. When it names an `adminEmail` that admin must own
/// the session.
pub async fn deactivate_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<MessageResponse> {
    let requested_by = AdminEmailRequest::from_optional_body(&body)?.and_then(|r| r.admin_email);
    state
        .competition
        .admin
        .deactivate_session(&session_id, requested_by.as_deref())
        .await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Session deactivated successfully",
    }))
}

/// `GET /api/admin/admin-emails`
pub async fn admin_emails(State(state): State<AppState>) -> Json<AdminEmailsResponse> {
    let admin_emails = state.competition.admin.admin_emails();
    Json(AdminEmailsResponse {
        success: true,
        count: admin_emails.len(),
        admin_emails,
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "OK", "timestamp": state.clock.now_millis() }))
}

/// `GET /api/test`
pub async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Backend API is working!",
        "timestamp": state.clock.now_millis(),
        "endpoints": {
            "generateQR": "POST /api/admin/generate-qr",
            "validateQR": "POST /api/admin/validate-qr",
            "leaderboard": "GET /api/admin/leaderboard",
            "clearRecords": "POST /api/admin/clear-records",
            "activeSessions": "GET /api/admin/sessions/{adminEmail}",
            "deactivateSession": "PUT /api/admin/sessions/{sessionId}/deactivate",
            "adminEmails": "GET /api/admin/admin-emails"
        }
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "not_found",
            "message": "Route not found",
            "availableRoutes": {
                "test": "GET /api/test",
                "health": "GET /health",
                "admin": "/api/admin/*"
            }
        })),
    )
}
