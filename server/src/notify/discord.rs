//! Discord REST delivery.

use std::time::Duration;

use async_trait::async_trait;

use super::Notifier;
use crate::error::NotifyError;

const DISCORD_API: &str = "https://discord.com/api/v10";

pub struct DiscordNotifier {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl DiscordNotifier {
    pub fn new(token: &str) -> Result<Self, NotifyError> {
        Self::with_base(token, DISCORD_API)
    }

    pub fn with_base(token: &str, api_base: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
            token: token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(format!("{}/channels/{channel_id}/messages", self.api_base))
            .header("Authorization", format!("Bot {}", self.token))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}
