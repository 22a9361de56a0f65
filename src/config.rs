use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BotError, Result};

/// Execution backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Paper,
    Live,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    pub symbol: String,
    pub timeframe: String,
    pub candle_limit: u32,
    pub state_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    pub trailing_fraction: f64,
    pub profit_trigger_fraction: f64,
    pub initial_stop_fraction: f64,
    pub max_drawdown_fraction: f64,
    pub cooldown_hours: i64,
    pub risk_per_trade_fraction: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    /// Base URL of the MACD signal service
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSettings {
    pub mode: ExecutionMode,
    /// Order bridge base URL, required in live mode
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub paper_starting_balance: f64,
    pub assumed_slippage: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifySettings {
    /// Slack incoming webhook. Alerts go to the log when unset.
    pub slack_webhook_url: Option<String>,
}

/// Full bot configuration
///
/// Layered: built-in defaults, then an optional TOML file, then
/// environment variables with the `MACDBOT` prefix and `__` as the
/// nesting separator (e.g. `MACDBOT_RISK__MAX_DRAWDOWN_FRACTION=0.1`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bot: BotSettings,
    pub risk: RiskSettings,
    pub feed: FeedSettings,
    pub execution: ExecutionSettings,
    /// The whole section may be absent; notifications then go to the log.
    #[serde(default)]
    pub notify: NotifySettings,
}

impl Settings {
    /// Load and validate configuration. Any problem here is fatal at
    /// startup; nothing is retried or defaulted past validation.
    pub fn load(config_path: &Path) -> Result<Self> {
        let settings: Settings = config::Config::builder()
            .set_default("bot.symbol", "BTCUSDT")?
            .set_default("bot.timeframe", "5m")?
            .set_default("bot.candle_limit", 100)?
            .set_default("bot.state_path", "macdbot_state.json")?
            .set_default("risk.trailing_fraction", 0.005)?
            .set_default("risk.profit_trigger_fraction", 0.01)?
            .set_default("risk.initial_stop_fraction", 0.01)?
            .set_default("risk.max_drawdown_fraction", 0.05)?
            .set_default("risk.cooldown_hours", 24)?
            .set_default("risk.risk_per_trade_fraction", 0.01)?
            .set_default("feed.base_url", "")?
            .set_default("feed.timeout_secs", 10)?
            .set_default("execution.mode", "paper")?
            .set_default("execution.timeout_secs", 10)?
            .set_default("execution.paper_starting_balance", 10000.0)?
            .set_default("execution.assumed_slippage", 0.0005)?
            .add_source(config::File::from(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("MACDBOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        check_fraction("risk.trailing_fraction", self.risk.trailing_fraction)?;
        check_fraction(
            "risk.profit_trigger_fraction",
            self.risk.profit_trigger_fraction,
        )?;
        check_fraction("risk.initial_stop_fraction", self.risk.initial_stop_fraction)?;
        check_fraction("risk.max_drawdown_fraction", self.risk.max_drawdown_fraction)?;
        check_fraction(
            "risk.risk_per_trade_fraction",
            self.risk.risk_per_trade_fraction,
        )?;

        if self.risk.cooldown_hours <= 0 {
            return Err(BotError::Config(
                "risk.cooldown_hours must be positive".to_string(),
            ));
        }
        if self.bot.candle_limit == 0 {
            return Err(BotError::Config(
                "bot.candle_limit must be positive".to_string(),
            ));
        }
        if self.feed.base_url.is_empty() {
            return Err(BotError::Config(
                "feed.base_url must be set (the MACD signal service endpoint)".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.execution.assumed_slippage) {
            return Err(BotError::Config(
                "execution.assumed_slippage must lie in [0, 1)".to_string(),
            ));
        }

        match self.execution.mode {
            ExecutionMode::Paper => {
                if self.execution.paper_starting_balance <= 0.0 {
                    return Err(BotError::Config(
                        "execution.paper_starting_balance must be positive".to_string(),
                    ));
                }
            }
            ExecutionMode::Live => {
                if self
                    .execution
                    .base_url
                    .as_deref()
                    .unwrap_or("")
                    .is_empty()
                {
                    return Err(BotError::Config(
                        "execution.base_url is required in live mode".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(BotError::Config(format!(
            "{name} must lie in (0, 1), got {value}"
        )))
    }
}
