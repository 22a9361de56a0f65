use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::error::Result;
use crate::execution::adapter::ExecutionAdapter;
use crate::execution::decision::{CloseReason, DecisionEngine, TradeAction, TradeDecision};
use crate::feed::PriceFeed;
use crate::models::TradeSide;
use crate::notify::{Channel, Notifier};
use crate::risk::{BlockReason, RiskGovernor, StopEvent, TrailingStopEngine, Verdict};
use crate::state::StateStore;

/// What one cycle did, for logging and operators
#[derive(Debug)]
pub struct CycleReport {
    pub decision: TradeDecision,
    pub fill_price: Option<f64>,
    pub realized_pnl: Option<f64>,
}

/// One full poll-decide-act-persist pass
///
/// The cycle is strictly sequential: load state, observe the market, gate
/// through risk, maintain stops, decide, execute, settle, persist. Any
/// error aborts the pass before the save so the on-disk state still
/// describes the last completed cycle.
pub struct TradeCycle {
    symbol: String,
    timeframe: String,
    candle_limit: u32,
    governor: RiskGovernor,
    stops: TrailingStopEngine,
    engine: DecisionEngine,
    store: StateStore,
    feed: Box<dyn PriceFeed>,
    adapter: Box<dyn ExecutionAdapter>,
    notifier: Box<dyn Notifier>,
}

impl TradeCycle {
    pub fn new(
        settings: &Settings,
        feed: Box<dyn PriceFeed>,
        adapter: Box<dyn ExecutionAdapter>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            symbol: settings.bot.symbol.clone(),
            timeframe: settings.bot.timeframe.clone(),
            candle_limit: settings.bot.candle_limit,
            governor: RiskGovernor {
                max_drawdown_fraction: settings.risk.max_drawdown_fraction,
                cooldown_hours: settings.risk.cooldown_hours,
            },
            stops: TrailingStopEngine {
                trailing_fraction: settings.risk.trailing_fraction,
                profit_trigger_fraction: settings.risk.profit_trigger_fraction,
                initial_stop_fraction: settings.risk.initial_stop_fraction,
            },
            engine: DecisionEngine::new(
                settings.bot.symbol.clone(),
                settings.risk.risk_per_trade_fraction,
            ),
            store: StateStore::new(settings.bot.state_path.clone()),
            feed,
            adapter,
            notifier,
        }
    }

    pub async fn run(&self) -> Result<CycleReport> {
        self.run_at(None).await
    }

    /// Test seam: pin "now" so cooldown arithmetic is deterministic.
    pub async fn run_at(&self, now_override: Option<DateTime<Utc>>) -> Result<CycleReport> {
        match self.execute_cycle(now_override).await {
            Ok(report) => Ok(report),
            Err(e) => {
                // Failures surface to the operator, then abort the cycle.
                self.notify(
                    Channel::Alerts,
                    &format!("{} cycle aborted: {e}", self.symbol),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn execute_cycle(&self, now_override: Option<DateTime<Utc>>) -> Result<CycleReport> {
        let now = now_override.unwrap_or_else(Utc::now);

        let mut state = self.store.load();

        // Feed failure aborts here; nothing has mutated, nothing is saved.
        let snapshot = self
            .feed
            .fetch_signal(&self.symbol, &self.timeframe, self.candle_limit)
            .await?;
        tracing::info!(
            "📊 {} {} price {:.4}, signal {:?}",
            self.symbol,
            self.timeframe,
            snapshot.price,
            snapshot.signal
        );

        // The drawdown limit is measured against the balance seen on the
        // very first run. Seed it once and never overwrite it.
        if state.account.initial_balance.is_none() {
            let balance = self.adapter.fetch_balance().await?;
            state.account.initial_balance = Some(balance);
            tracing::info!("💰 Balance baseline recorded: {balance:.2}");
        }

        let verdict = self.governor.evaluate(&mut state.account, now);

        // Stop maintenance runs every cycle with an open position, even
        // under a risk block. A breached stop must still force the exit.
        let stop_exit = match self.stops.update(&mut state.position, snapshot.price) {
            Some(StopEvent::InitialStopHit { .. }) => Some(CloseReason::StopLossInitial),
            Some(StopEvent::Raised { from, to }) => {
                self.notify(
                    Channel::Alerts,
                    &format!("{} stop raised {:.4} -> {:.4}", self.symbol, from, to),
                )
                .await;
                None
            }
            None => None,
        };
        let stop_exit = stop_exit.or_else(|| {
            self.stops
                .stop_hit(&state.position, snapshot.price)
                .then_some(CloseReason::StopLossTrailing)
        });

        let decision = self.engine.decide(
            snapshot.signal,
            snapshot.price,
            &state.account,
            &state.position,
            verdict,
            stop_exit,
        );
        tracing::info!("Decision: {:?} ({})", decision.action, decision.reason);

        let mut fill_price = None;
        let mut realized_pnl = None;

        match decision.action {
            TradeAction::Open { quantity } => {
                let fill = self
                    .adapter
                    .execute(&self.symbol, TradeSide::Buy, quantity, snapshot.price)
                    .await?;
                state
                    .position
                    .open(fill.price, quantity, self.stops.initial_stop_fraction);
                fill_price = Some(fill.price);
                self.notify(
                    Channel::Trades,
                    &format!(
                        "Opened {:.8} {} @ {:.4}, stop {:.4}",
                        quantity, self.symbol, fill.price, state.position.stop_price
                    ),
                )
                .await;
            }
            TradeAction::Close { quantity, reason } => {
                // A failed close propagates before settle_close, leaving
                // the position on the books for the next cycle.
                let fill = self
                    .adapter
                    .execute(&self.symbol, TradeSide::Sell, quantity, snapshot.price)
                    .await?;
                let pnl = state.settle_close(fill.price);
                fill_price = Some(fill.price);
                realized_pnl = Some(pnl);
                let label = match reason {
                    CloseReason::Signal => "signal close",
                    CloseReason::StopLossInitial => "initial stop",
                    CloseReason::StopLossTrailing => "trailing stop",
                };
                self.notify(
                    Channel::Trades,
                    &format!(
                        "Closed {:.8} {} @ {:.4} ({}), pnl {:+.4}",
                        quantity, self.symbol, fill.price, label, pnl
                    ),
                )
                .await;
            }
            TradeAction::Blocked(BlockReason::Drawdown) => {
                // Freshly tripped this cycle; later cycles report Cooldown.
                self.notify(
                    Channel::Alerts,
                    &format!(
                        "{} trading paused: drawdown limit reached (loss {:.4})",
                        self.symbol, state.account.cumulative_loss
                    ),
                )
                .await;
            }
            TradeAction::Blocked(BlockReason::Cooldown) => {
                tracing::debug!("Cycle blocked by active cooldown");
            }
            TradeAction::Hold => {
                tracing::debug!("Nothing to do");
            }
        }

        // A loss settled above may have pushed cumulative loss over the
        // line; re-check so the cooldown starts now, not next cycle.
        if let Verdict::Blocked(BlockReason::Drawdown) =
            self.governor.evaluate(&mut state.account, now)
        {
            self.notify(
                Channel::Alerts,
                &format!(
                    "{} trading paused: drawdown limit reached after close (loss {:.4})",
                    self.symbol, state.account.cumulative_loss
                ),
            )
            .await;
        }

        self.store.save(&state)?;

        Ok(CycleReport {
            decision,
            fill_price,
            realized_pnl,
        })
    }

    // Notifications are best-effort; a dead webhook must not stop trading.
    async fn notify(&self, channel: Channel, message: &str) {
        if let Err(e) = self.notifier.send(channel, message).await {
            tracing::warn!("Notification failed: {e}");
        }
    }
}
