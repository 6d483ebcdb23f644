//! HTTP surface: a JSON API over the competition services.

mod dto;
mod error;
mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post, put};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use cubetime_core::Clock;

use crate::competition::Competition;

pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub competition: Arc<Competition>,
    pub clock: Arc<dyn Clock>,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/test", get(handlers::service_info))
        .route("/api/admin/generate-qr", post(handlers::generate_qr))
        .route("/api/admin/validate-qr", post(handlers::validate_qr))
        .route("/api/admin/leaderboard", get(handlers::leaderboard))
        .route("/api/admin/clear-records", post(handlers::clear_records))
        .route("/api/admin/admin-emails", get(handlers::admin_emails))
        // Both session routes share one parameter name; it is an admin
        // email on the first and a session id on the second.
        .route("/api/admin/sessions/{key}", get(handlers::active_sessions))
        .route(
            "/api/admin/sessions/{key}/deactivate",
            put(handlers::deactivate_session),
        )
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
