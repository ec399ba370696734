//! Outbound chat notifications.
//!
//! Delivery is best effort. Callers in the cascade, activation fan-out and
//! sweeps log and count a failed send; they never roll back state for it.

pub mod mattermost;
pub mod messages;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use mattermost::MattermostNotifier;
pub use messages::NotificationTemplates;

/// A titled direct message with an optional action link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
}

impl Notification {
    /// Markdown body as posted to the chat channel.
    pub fn render(&self) -> String {
        let mut body = format!("**{}**\n\n{}", self.title, self.message);
        if let (Some(url), Some(text)) = (&self.action_url, &self.action_text) {
            body.push_str(&format!("\n\n[{}]({})", text, url));
        }
        body
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("chat user not found: {0}")]
    UnknownRecipient(String),

    #[error("chat server rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid notifier configuration: {0}")]
    Misconfigured(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_notification(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Sent/failed counters for a batch of independent deliveries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryTally {
    pub sent: usize,
    pub failed: usize,
}

impl DeliveryTally {
    /// Sends one notification and records the result. Failures are logged, never returned.
    pub async fn deliver(&mut self, notifier: &dyn Notifier, notification: &Notification) {
        match notifier.send_notification(notification).await {
            Ok(()) => self.sent += 1,
            Err(e) => {
                self.failed += 1;
                tracing::warn!(
                    recipient = %notification.recipient,
                    title = %notification.title,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }
}

/// Used when no chat server is configured; writes notifications to the log.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %notification.recipient,
            title = %notification.title,
            action_url = notification.action_url.as_deref().unwrap_or(""),
            "Notification (chat delivery disabled)"
        );
        Ok(())
    }
}
