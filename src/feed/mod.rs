use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{BotError, Result};
use crate::models::{Signal, SignalSnapshot};

/// Upstream source of price and MACD signal
///
/// The indicator math lives on the other side of this seam; the bot only
/// consumes its verdict.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_signal(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<SignalSnapshot>;
}

#[derive(Debug, Deserialize)]
struct SignalResponse {
    price: f64,
    signal: Signal,
}

/// Client for the external MACD signal service
#[derive(Clone)]
pub struct RestSignalFeed {
    client: Client,
    base_url: String,
}

impl RestSignalFeed {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("build feed http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PriceFeed for RestSignalFeed {
    async fn fetch_signal(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: u32,
    ) -> Result<SignalSnapshot> {
        let url = format!("{}/signal", self.base_url);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("timeframe", timeframe),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| BotError::DataUnavailable(format!("signal request failed: {e}")))?
            .error_for_status()
            .map_err(|e| BotError::DataUnavailable(format!("signal service error: {e}")))?;

        let parsed: SignalResponse = response
            .json()
            .await
            .map_err(|e| BotError::DataUnavailable(format!("malformed signal response: {e}")))?;

        if parsed.price <= 0.0 {
            return Err(BotError::DataUnavailable(format!(
                "feed returned non-positive price {}",
                parsed.price
            )));
        }

        tracing::debug!(
            symbol,
            price = parsed.price,
            signal = ?parsed.signal,
            "Fetched signal snapshot"
        );

        Ok(SignalSnapshot {
            price: parsed.price,
            signal: parsed.signal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_signal_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/signal")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
                mockito::Matcher::UrlEncoded("timeframe".into(), "5m".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "100".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 43250.5, "signal": "BUY"}"#)
            .create_async()
            .await;

        let feed = RestSignalFeed::new(server.url(), Duration::from_secs(5)).unwrap();
        let snapshot = feed.fetch_signal("BTCUSDT", "5m", 100).await.unwrap();

        assert_eq!(snapshot.price, 43250.5);
        assert_eq!(snapshot.signal, Signal::Buy);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_signal_passes_no_data_through() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/signal")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 43250.5, "signal": "NO_DATA"}"#)
            .create_async()
            .await;

        let feed = RestSignalFeed::new(server.url(), Duration::from_secs(5)).unwrap();
        let snapshot = feed.fetch_signal("BTCUSDT", "5m", 100).await.unwrap();

        // NO_DATA is an in-band value, not an error
        assert_eq!(snapshot.signal, Signal::NoData);
    }

    #[tokio::test]
    async fn test_fetch_signal_maps_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/signal")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let feed = RestSignalFeed::new(server.url(), Duration::from_secs(5)).unwrap();
        let result = feed.fetch_signal("BTCUSDT", "5m", 100).await;

        assert!(matches!(result, Err(BotError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_signal_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/signal")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"note": "no candles here"}"#)
            .create_async()
            .await;

        let feed = RestSignalFeed::new(server.url(), Duration::from_secs(5)).unwrap();
        let result = feed.fetch_signal("BTCUSDT", "5m", 100).await;

        assert!(matches!(result, Err(BotError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_fetch_signal_rejects_non_positive_price() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/signal")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 0.0, "signal": "HOLD"}"#)
            .create_async()
            .await;

        let feed = RestSignalFeed::new(server.url(), Duration::from_secs(5)).unwrap();
        let result = feed.fetch_signal("BTCUSDT", "5m", 100).await;

        assert!(matches!(result, Err(BotError::DataUnavailable(_))));
    }
}
