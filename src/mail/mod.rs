pub mod templates;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{self, MailBackend};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail API not configured")]
    NotConfigured,
    #[error("Mail API request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Mail API rejected message with status {0}")]
    Rejected(u16),
}

/// Outgoing email seam
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Email (log backend)");
        tracing::debug!(html = %message.html, "Email body");
        Ok(())
    }
}

/// Posts messages as JSON to a transactional mail API
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    sender: String,
}

impl HttpMailer {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>, sender: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.api_url).json(&json!({
            "from": self.sender,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }
        info!(to = %message.to, "Email sent");
        Ok(())
    }
}

pub fn build_mailer() -> Result<Arc<dyn Mailer>, MailError> {
    let mail = &config::config().mail;
    match mail.backend {
        MailBackend::Log => Ok(Arc::new(LogMailer)),
        MailBackend::Http => {
            let url = mail.api_url.clone().ok_or(MailError::NotConfigured)?;
            Ok(Arc::new(HttpMailer::new(url, mail.api_key.clone(), mail.sender.clone())))
        }
    }
}
