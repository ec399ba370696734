use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::config::NotifierConfig;
use crate::notifications::{Notification, Notifier, NotifyError};

#[derive(Debug, Deserialize)]
struct ChatUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChatChannel {
    id: String,
}

/// Sends direct messages through the Mattermost REST API (v4) as the bot
/// account that owns the configured token.
pub struct MattermostNotifier {
    client: Client,
    api_base: String,
    token: String,
    bot_user_id: OnceCell<String>,
}

impl MattermostNotifier {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, NotifyError> {
        if base_url.trim().is_empty() || token.trim().is_empty() {
            return Err(NotifyError::Misconfigured(
                "MATTERMOST_URL and MATTERMOST_TOKEN are required".to_string(),
            ));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: format!("{}/api/v4", base_url.trim_end_matches('/')),
            token: token.to_string(),
            bot_user_id: OnceCell::new(),
        })
    }

    pub fn from_config(config: &NotifierConfig) -> Result<Option<Self>, NotifyError> {
        match (&config.mattermost_url, &config.mattermost_token) {
            (Some(url), Some(token)) => {
                Self::new(url, token, Duration::from_secs(config.timeout_secs)).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, NotifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    async fn user_id_by_username(&self, username: &str) -> Result<String, NotifyError> {
        let response = self
            .client
            .get(format!("{}/users/username/{}", self.api_base, username))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(NotifyError::UnknownRecipient(username.to_string()));
        }
        let user: ChatUser = Self::check(response).await?.json().await?;
        Ok(user.id)
    }

    async fn bot_user_id(&self) -> Result<&str, NotifyError> {
        let id = self
            .bot_user_id
            .get_or_try_init(|| async {
                let response = self
                    .client
                    .get(format!("{}/users/me", self.api_base))
                    .bearer_auth(&self.token)
                    .send()
                    .await?;
                let me: ChatUser = Self::check(response).await?.json().await?;
                Ok::<_, NotifyError>(me.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn direct_channel(&self, user_id: &str) -> Result<String, NotifyError> {
        let bot_id = self.bot_user_id().await?;
        let response = self
            .client
            .post(format!("{}/channels/direct", self.api_base))
            .bearer_auth(&self.token)
            .json(&json!([user_id, bot_id]))
            .send()
            .await?;
        let channel: ChatChannel = Self::check(response).await?.json().await?;
        Ok(channel.id)
    }
}

#[async_trait]
impl Notifier for MattermostNotifier {
    async fn send_notification(&self, notification: &Notification) -> Result<(), NotifyError> {
        let user_id = self.user_id_by_username(&notification.recipient).await?;
        let channel_id = self.direct_channel(&user_id).await?;
        let response = self
            .client
            .post(format!("{}/posts", self.api_base))
            .bearer_auth(&self.token)
            .json(&json!({
                "channel_id": channel_id,
                "message": notification.render(),
            }))
            .send()
            .await?;
        Self::check(response).await?;
        tracing::debug!(recipient = %notification.recipient, "Chat notification delivered");
        Ok(())
    }
}
