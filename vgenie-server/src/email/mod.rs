//! Transactional email
//!
//! [`HttpMailer`] posts to a Resend-style HTTP API. Without an API key the
//! server uses [`LogMailer`], which only logs what would have been sent.

pub mod http;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;

pub use http::HttpMailer;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("email provider returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// A rendered message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Logs messages instead of sending them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(to = %message.to, subject = %message.subject, "Email not sent (no provider configured)");
        Ok(())
    }
}

/// Send and log failures; the caller's request goes on regardless
pub async fn send_best_effort(mailer: &dyn Mailer, message: EmailMessage, kind: &'static str) {
    match mailer.send(&message).await {
        Ok(()) => tracing::debug!(kind, to = %message.to, "email sent"),
        Err(e) => tracing::warn!(kind, to = %message.to, error = %e, "Failed to send email"),
    }
}
