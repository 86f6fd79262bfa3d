//! Optional operator notifications about top-ups.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> anyhow::Result<()>;
}

/// Used when no notification channel is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        debug!("Notification (not delivered): {}", message);
        Ok(())
    }
}

/// Posts markdown messages to a Telegram chat through the bot API.
pub struct TelegramNotifier {
    api_url: String,
    token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> anyhow::Result<Self> {
        Self::with_api_url(TELEGRAM_API.to_string(), token, chat_id)
    }

    pub fn with_api_url(api_url: String, token: String, chat_id: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            api_url,
            token,
            chat_id,
            client,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> anyhow::Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url.trim_end_matches('/'), self.token);
        self.client
            .post(url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
                "parse_mode": "Markdown",
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
