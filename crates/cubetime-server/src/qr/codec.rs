//! Rendering payloads into scannable images.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;

use super::{QrError, QrPayload};

/// A payload rendered for display or delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQr {
    /// Exact text carried by the QR symbol.
    pub text: String,
    /// MIME type of the rendered image.
    pub mime_type: &'static str,
    /// Rendered image bytes.
    pub image: Vec<u8>,
}

impl EncodedQr {
    pub fn image_base64(&self) -> String {
        STANDARD.encode(&self.image)
    }

    /// `data:` URL suitable for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.image_base64())
    }
}

/// Encodes payloads into images and turns scanned text back into payloads.
///
/// Camera capture and image decoding happen on the client; the server only
/// ever sees the decoded text.
pub trait QrCodec: Send + Sync {
    fn encode(&self, payload: &QrPayload) -> Result<EncodedQr, QrError>;

    fn decode_text(&self, text: &str) -> Result<QrPayload, QrError> {
        QrPayload::from_json(text)
    }
}

/// SVG renderer backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy)]
pub struct SvgQrCodec {
    min_size: u32,
}

impl SvgQrCodec {
    pub const fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl Default for SvgQrCodec {
    fn default() -> Self {
        Self::new(200)
    }
}

impl QrCodec for SvgQrCodec {
    fn encode(&self, payload: &QrPayload) -> Result<EncodedQr, QrError> {
        let text = payload.to_json()?;
        let code = QrCode::new(text.as_bytes()).map_err(|e| QrError::Render(e.to_string()))?;
        let image = code
            .render::<svg::Color>()
            .min_dimensions(self.min_size, self.min_size)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .quiet_zone(true)
            .build();

        Ok(EncodedQr {
            text,
            mime_type: "image/svg+xml",
            image: image.into_bytes(),
        })
    }
}
