use thiserror::Error;

/// Failure taxonomy for a trading cycle.
///
/// Every external collaborator failure maps to one of these so the cycle
/// can decide what to abort and what to keep on disk.
#[derive(Debug, Error)]
pub enum BotError {
    /// Price/signal feed returned no usable data or errored out.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// Order placement failed or timed out. No state was mutated.
    #[error("order execution failed: {0}")]
    ExecutionFailure(String),

    /// State file could not be read or written.
    #[error("state persistence failed: {0}")]
    PersistenceFailure(String),

    /// Bad or missing configuration, caught at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Notification delivery failed. Callers log this and carry on.
    #[error("notification failed: {0}")]
    Notification(String),
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BotError::DataUnavailable("no candles returned".to_string());
        assert_eq!(
            err.to_string(),
            "market data unavailable: no candles returned"
        );

        let err = BotError::ExecutionFailure("order rejected".to_string());
        assert!(err.to_string().contains("order rejected"));
    }
}
