//! Outgoing mail.
//!
//! Only password reset links are sent today. Delivery goes through the
//! [`Mailer`] trait so tests and local setups can swap SendGrid for
//! [`LogMailer`].

pub mod sendgrid;

use crate::types::Result;
use crate::utils::toml_config::{AdmissionsConfig, ConfigError, MailProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

pub use sendgrid::SendGridMailer;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

/// A message handed to [`LogMailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Logs messages instead of sending them, keeping a copy for inspection.
#[derive(Debug, Default)]
pub struct LogMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        info!(to, subject, "Mail delivery disabled, message logged only");
        self.sent.lock().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

/// Builds the mailer selected by `[mail] provider`.
pub fn build_mailer(config: &AdmissionsConfig) -> std::result::Result<Arc<dyn Mailer>, ConfigError> {
    match config.mail.provider {
        MailProvider::Sendgrid => Ok(Arc::new(SendGridMailer::new(
            config.mail.api_base.clone(),
            config.mail_api_key()?,
            config.mail.sender.clone(),
        ))),
        MailProvider::Log => Ok(Arc::new(LogMailer::new())),
    }
}

pub const RESET_SUBJECT: &str = "Password Reset Request";

/// HTML body of the password reset mail.
pub fn reset_email_body(reset_link: &str, valid_minutes: i64) -> String {
    format!(
        "<h3>Password Reset Request</h3>\n\
         <p>Please click the link below to reset your password. \
         This link is valid for {valid_minutes} minutes.</p>\n\
         <p><a href=\"{reset_link}\">Reset Password</a></p>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_records_messages() {
        let mailer = LogMailer::new();
        mailer
            .send_html("staff@example.edu", RESET_SUBJECT, "<p>hi</p>")
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "staff@example.edu");
    }

    #[test]
    fn test_reset_body_contains_link() {
        let body = reset_email_body("http://localhost:3000/reset-password?token=abc", 15);
        assert!(body.contains("href=\"http://localhost:3000/reset-password?token=abc\""));
        assert!(body.contains("valid for 15 minutes"));
    }

    #[test]
    fn test_build_log_mailer_by_default() {
        assert!(build_mailer(&AdmissionsConfig::default()).is_ok());
    }
}
