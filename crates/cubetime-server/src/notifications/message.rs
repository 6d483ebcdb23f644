//! Email content for session notices.

use serde::Serialize;

use crate::qr::EncodedQr;

/// Subject line of the session email.
pub const SESSION_SUBJECT: &str = "Your Admin QR Code - Rubik's Cube Competition";

/// Everything needed to tell an admin about a freshly issued session.
#[derive(Debug, Clone)]
pub struct SessionNotice {
    pub admin_email: String,
    pub session_id: String,
    /// Issuance time, Unix milliseconds.
    pub issued_at_millis: i64,
    /// Expiry, Unix seconds.
    pub expires_at: i64,
    pub qr: EncodedQr,
}

/// A rendered transactional email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
    pub attachment_name: String,
    /// Base64 attachment body.
    pub attachment_content: String,
}

impl SessionNotice {
    /// Render the email. Times are shown as Unix timestamps (UTC) since the
    /// server has no notion of the admin's locale.
    pub fn to_email(&self) -> EmailMessage {
        let image = self.qr.image_base64();
        let mime = self.qr.mime_type;
        let issued_secs = self.issued_at_millis.div_euclid(1000);

        let html_content = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #0a0a0a; color: #ffffff;">
  <h1 style="color: #00FFFF; text-align: center;">ADMIN QR CODE</h1>
  <p style="text-align: center; color: #cccccc;">Your admin validation QR code for the Rubik's Cube competition</p>
  <div style="text-align: center; margin: 30px 0;">
    <img src="data:{mime};base64,{image}" alt="Admin QR Code" style="width: 200px; height: 200px; background: white; padding: 10px; border-radius: 10px;" />
    <p style="color: #cccccc; font-size: 12px;">If the QR code is not visible above, check the attachment.</p>
  </div>
  <div style="background-color: #1a1a1a; padding: 20px; border-radius: 10px; margin: 20px 0;">
    <h3 style="color: #00FFFF; margin-top: 0;">Session Details:</h3>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Session ID:</strong> {session}</p>
    <p><strong>Generated:</strong> {issued_secs} (Unix time, UTC)</p>
    <p><strong>Expires:</strong> {expires} (Unix time, UTC)</p>
  </div>
  <div style="background-color: #2a2a2a; padding: 15px; border-radius: 5px; margin: 20px 0;">
    <p style="margin: 0; color: #ffaa00;"><strong>Instructions:</strong></p>
    <p style="margin: 5px 0 0 0; color: #cccccc;">Use this QR code to validate participant times during the competition. Scan this code when prompted during the validation process.</p>
  </div>
  <p style="text-align: center; color: #888888; font-size: 12px; margin-top: 30px;">This QR code is valid for this competition session only.</p>
</div>"#,
            email = html_escape(&self.admin_email),
            session = html_escape(&self.session_id),
            expires = self.expires_at,
        );

        let text_content = format!(
            "Your admin validation QR code for the Rubik's Cube competition.\n\n\
             Email: {}\nSession ID: {}\nGenerated: {issued_secs}\nExpires: {}\n\n\
             Scan the attached QR code when prompted during validation.",
            self.admin_email, self.session_id, self.expires_at,
        );

        let extension = if mime == "image/svg+xml" { "svg" } else { "png" };

        EmailMessage {
            to: self.admin_email.clone(),
            subject: SESSION_SUBJECT.to_string(),
            html_content,
            text_content,
            attachment_name: format!("qrcode.{extension}"),
            attachment_content: image,
        }
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
