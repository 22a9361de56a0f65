use serde::{Deserialize, Serialize};

/// Trading signal from the upstream MACD service
///
/// `NoData` means the service answered but did not have enough candles to
/// compute the indicator. An unreachable or empty feed is an error, not a
/// signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
    NoData,
}

/// Order direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Price and signal pair for one evaluation cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub price: f64,
    pub signal: Signal,
}
