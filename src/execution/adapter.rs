use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{BotError, Result};
use crate::models::TradeSide;

/// Result of a filled order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
}

/// Order routing seam
///
/// An `Err` from `execute` means nothing was filled; callers must leave
/// account and position state exactly as they were.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn execute(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: f64,
        price: f64,
    ) -> Result<Fill>;

    async fn fetch_balance(&self) -> Result<f64>;
}

/// Simulated fills for paper trading
///
/// Fills at the observed price adjusted by an assumed slippage so paper
/// runs do not look better than a live venue would allow.
pub struct PaperExecutionAdapter {
    starting_balance: f64,
    assumed_slippage: f64,
}

impl PaperExecutionAdapter {
    pub fn new(starting_balance: f64, assumed_slippage: f64) -> Self {
        Self {
            starting_balance,
            assumed_slippage,
        }
    }
}

#[async_trait]
impl ExecutionAdapter for PaperExecutionAdapter {
    async fn execute(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: f64,
        price: f64,
    ) -> Result<Fill> {
        // Slippage works against us in both directions
        let fill_price = match side {
            TradeSide::Buy => price * (1.0 + self.assumed_slippage),
            TradeSide::Sell => price * (1.0 - self.assumed_slippage),
        };

        tracing::info!(
            "📄 Paper fill: {:?} {:.8} {} @ {:.4} (quoted {:.4})",
            side,
            quantity,
            symbol,
            fill_price,
            price
        );

        Ok(Fill { price: fill_price })
    }

    async fn fetch_balance(&self) -> Result<f64> {
        Ok(self.starting_balance)
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    fill_price: f64,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: f64,
}

/// Orders routed over HTTP to an execution bridge
///
/// The bridge owns venue credentials and order plumbing; this client only
/// speaks its small JSON API.
pub struct RestExecutionAdapter {
    client: Client,
    base_url: String,
}

impl RestExecutionAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Config(format!("build execution http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ExecutionAdapter for RestExecutionAdapter {
    async fn execute(
        &self,
        symbol: &str,
        side: TradeSide,
        quantity: f64,
        price: f64,
    ) -> Result<Fill> {
        let url = format!("{}/orders", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "symbol": symbol,
                "side": side,
                "quantity": quantity,
                "price": price,
            }))
            .send()
            .await
            .map_err(|e| BotError::ExecutionFailure(format!("order request failed: {e}")))?
            .error_for_status()
            .map_err(|e| BotError::ExecutionFailure(format!("order rejected: {e}")))?;

        let parsed: OrderResponse = response
            .json()
            .await
            .map_err(|e| BotError::ExecutionFailure(format!("malformed order response: {e}")))?;

        if parsed.fill_price <= 0.0 {
            return Err(BotError::ExecutionFailure(format!(
                "bridge reported non-positive fill price {}",
                parsed.fill_price
            )));
        }

        tracing::info!(
            "Order filled: {:?} {:.8} {} @ {:.4}",
            side,
            quantity,
            symbol,
            parsed.fill_price
        );

        Ok(Fill {
            price: parsed.fill_price,
        })
    }

    async fn fetch_balance(&self) -> Result<f64> {
        let url = format!("{}/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BotError::ExecutionFailure(format!("balance request failed: {e}")))?
            .error_for_status()
            .map_err(|e| BotError::ExecutionFailure(format!("balance lookup rejected: {e}")))?;

        let parsed: BalanceResponse = response
            .json()
            .await
            .map_err(|e| BotError::ExecutionFailure(format!("malformed balance response: {e}")))?;

        Ok(parsed.balance)
    }
}
