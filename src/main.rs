use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::Parser;

use macdbot::config::{ExecutionMode, Settings};
use macdbot::execution::{
    ExecutionAdapter, PaperExecutionAdapter, RestExecutionAdapter, TradeCycle,
};
use macdbot::feed::{PriceFeed, RestSignalFeed};
use macdbot::notify::{LogNotifier, Notifier, SlackNotifier};

/// MACD signal follower with trailing-stop risk control.
///
/// Runs exactly one poll-decide-act-persist cycle and exits; schedule it
/// with cron or a systemd timer at the candle interval.
#[derive(Parser)]
#[command(name = "macdbot", version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Force paper execution regardless of config
    #[arg(long)]
    paper: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    tracing::info!("🚀 MacdBot starting");

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if cli.paper {
        settings.execution.mode = ExecutionMode::Paper;
    }

    tracing::info!("📊 Configuration:");
    tracing::info!(
        "  Symbol: {} ({} x{} candles)",
        settings.bot.symbol,
        settings.bot.timeframe,
        settings.bot.candle_limit
    );
    tracing::info!("  Mode: {:?}", settings.execution.mode);
    tracing::info!("  State file: {}", settings.bot.state_path.display());
    tracing::info!(
        "  Risk: trail {:.2}% / trigger {:.2}% / stop {:.2}% / drawdown {:.2}% / cooldown {}h",
        settings.risk.trailing_fraction * 100.0,
        settings.risk.profit_trigger_fraction * 100.0,
        settings.risk.initial_stop_fraction * 100.0,
        settings.risk.max_drawdown_fraction * 100.0,
        settings.risk.cooldown_hours
    );

    let cycle = build_cycle(&settings)?;
    let report = cycle.run().await.context("trade cycle failed")?;

    tracing::info!(
        "✅ Cycle complete: {:?} ({})",
        report.decision.action,
        report.decision.reason
    );
    if let Some(fill) = report.fill_price {
        tracing::info!("  Fill: {:.4}", fill);
    }
    if let Some(pnl) = report.realized_pnl {
        tracing::info!("  Realized PnL: {:+.4}", pnl);
    }

    Ok(())
}

// ============================================================================
// Wiring
// ============================================================================

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "macdbot=debug" } else { "macdbot=info" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_cycle(settings: &Settings) -> anyhow::Result<TradeCycle> {
    let feed: Box<dyn PriceFeed> = Box::new(RestSignalFeed::new(
        settings.feed.base_url.clone(),
        Duration::from_secs(settings.feed.timeout_secs),
    )?);

    let adapter: Box<dyn ExecutionAdapter> = match settings.execution.mode {
        ExecutionMode::Paper => {
            tracing::info!("📄 Paper execution enabled");
            Box::new(PaperExecutionAdapter::new(
                settings.execution.paper_starting_balance,
                settings.execution.assumed_slippage,
            ))
        }
        ExecutionMode::Live => {
            let base_url = settings
                .execution
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("live mode requires execution.base_url"))?;
            Box::new(RestExecutionAdapter::new(
                base_url,
                Duration::from_secs(settings.execution.timeout_secs),
            )?)
        }
    };

    let notifier: Box<dyn Notifier> = match settings.notify.slack_webhook_url.as_deref() {
        Some(url) if !url.is_empty() => Box::new(SlackNotifier::new(url)?),
        _ => {
            tracing::debug!("No Slack webhook configured, notifications go to the log");
            Box::new(LogNotifier)
        }
    };

    Ok(TradeCycle::new(settings, feed, adapter, notifier))
}
