use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;

use crate::error::{BotError, Result};

/// Routing hint for outbound messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Fills, closes, realized PnL
    Trades,
    /// Stop raises, drawdown blocks, failures
    Alerts,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: Channel, message: &str) -> Result<()>;
}

/// Posts messages to a Slack incoming webhook
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| BotError::Config(format!("build slack http client: {e}")))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, channel: Channel, message: &str) -> Result<()> {
        let prefix = match channel {
            Channel::Trades => "💹",
            Channel::Alerts => "🚨",
        };
        let text = format!(
            "{} [{}] {}",
            prefix,
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            message
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| BotError::Notification(format!("slack request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BotError::Notification(format!(
                "slack webhook returned {}",
                response.status()
            )));
        }

        tracing::debug!(?channel, "Notification delivered");
        Ok(())
    }
}

/// Fallback sink used when no webhook is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, channel: Channel, message: &str) -> Result<()> {
        match channel {
            Channel::Trades => tracing::info!("💹 {message}"),
            Channel::Alerts => tracing::warn!("🚨 {message}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slack_posts_text_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Regex(
                "Opened 0.5 BTCUSDT".to_string(),
            ))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let notifier = SlackNotifier::new(format!("{}/hook", server.url())).unwrap();
        notifier
            .send(Channel::Trades, "Opened 0.5 BTCUSDT @ 43250.5")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_slack_maps_webhook_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(format!("{}/hook", server.url())).unwrap();
        let result = notifier.send(Channel::Alerts, "drawdown limit hit").await;

        assert!(matches!(result, Err(BotError::Notification(_))));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier;
        notifier.send(Channel::Trades, "paper fill").await.unwrap();
        notifier.send(Channel::Alerts, "cooldown active").await.unwrap();
    }
}
