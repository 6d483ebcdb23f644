//! Mapping of service failures onto HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::competition::CompetitionError;

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub CompetitionError);

impl From<CompetitionError> for ApiError {
    fn from(e: CompetitionError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CompetitionError::malformed(rejection.body_text()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_emails: Option<&'a [String]>,
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self.0 {
            CompetitionError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            CompetitionError::MalformedRequest(_) | CompetitionError::InvalidSession => {
                StatusCode::BAD_REQUEST
            }
            CompetitionError::SessionExpired => StatusCode::GONE,
            CompetitionError::NotFound(_) => StatusCode::NOT_FOUND,
            CompetitionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            CompetitionError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let allowed_emails = match &self.0 {
            CompetitionError::Unauthorized { allowed } => Some(allowed.as_slice()),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: self.0.code(),
            message,
            allowed_emails,
        };
        (status, Json(body)).into_response()
    }
}
