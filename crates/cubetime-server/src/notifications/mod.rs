//! Admin notification support.
//!
//! When a session is issued the admin is sent an email with the QR code
//! embedded. Delivery is best effort: the session is already persisted and
//! usable, so a failure here is reported back as a flag and never undoes the
//! issuance.
//!
//! The HTTP mailer is only compiled when the `email` Cargo feature is
//! enabled. Without it, or without credentials, [`DisabledNotifier`] is used.

#[cfg(feature = "email")]
pub mod mailer;
pub mod message;

#[cfg(feature = "email")]
pub use mailer::HttpMailer;
pub use message::{EmailMessage, SessionNotice};

/// Errors that can occur in the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// No delivery channel is configured.
    #[error("Email delivery is not configured")]
    NotConfigured,

    /// Failed to build or send the HTTP request.
    #[error("Email request error: {0}")]
    Request(String),

    /// The email API returned a non-success status code.
    #[error("Email API error (status {status}): {body}")]
    ApiError {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body from the API.
        body: String,
    },
}

/// Delivers session notices to admins.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_session_issued(&self, notice: &SessionNotice) -> Result<(), NotificationError>;
}

/// Notifier used when email is not set up. Every attempt fails with
/// [`NotificationError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait::async_trait]
impl Notifier for DisabledNotifier {
    async fn notify_session_issued(
        &self,
        _notice: &SessionNotice,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured)
    }
}
