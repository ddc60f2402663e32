use super::Mailer;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, error};

/// Sends mail through the SendGrid v3 `mail/send` endpoint.
pub struct SendGridMailer {
    http_client: reqwest::Client,
    api_base: String,
    api_key: String,
    sender: String,
}

impl SendGridMailer {
    pub fn new(api_base: String, api_key: String, sender: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            sender,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/mail/send", self.api_base)
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.sender },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html }],
        });

        let response = self
            .http_client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Mail(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(%status, body = %text, "SendGrid rejected message");
            return Err(AppError::Mail("Failed to send reset email.".to_string()));
        }

        debug!(to, %status, "SendGrid accepted message");
        Ok(())
    }
}
