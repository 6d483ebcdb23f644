//! QR payload format and image codec.
//!
//! The payload is the JSON record an admin's QR code carries. It is what the
//! participant's scanner hands back when a time is submitted for validation.

mod codec;
mod payload;

pub use codec::{EncodedQr, QrCodec, SvgQrCodec};
pub use payload::{ADMIN_SESSION_TYPE, QrPayload};

/// Errors from payload serialization or image rendering.
#[derive(Debug, thiserror::Error)]
pub enum QrError {
    #[error("Invalid QR payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("QR rendering failed: {0}")]
    Render(String),
}
