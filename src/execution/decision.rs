use crate::models::Signal;
use crate::risk::{BlockReason, Verdict};
use crate::state::{AccountState, PositionState};

/// Why a position is being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// SELL crossover from the feed
    Signal,
    /// Price fell through the fixed safety stop below entry
    StopLossInitial,
    /// Price fell through a previously raised trailing stop
    StopLossTrailing,
}

/// What this cycle should do at the observed price
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeAction {
    Open { quantity: f64 },
    Close { quantity: f64, reason: CloseReason },
    Hold,
    Blocked(BlockReason),
}

/// One decision plus its audit trail
#[derive(Debug, Clone)]
pub struct TradeDecision {
    pub symbol: String,
    pub price: f64,
    pub action: TradeAction,
    pub reason: String,
}

/// Maps signal, state and risk verdict to a single action
pub struct DecisionEngine {
    symbol: String,
    risk_per_trade_fraction: f64,
}

impl DecisionEngine {
    pub fn new(symbol: impl Into<String>, risk_per_trade_fraction: f64) -> Self {
        Self {
            symbol: symbol.into(),
            risk_per_trade_fraction,
        }
    }

    /// Strict priority: stop exit, risk block, entry, signal exit, hold.
    ///
    /// A breached stop outranks even a risk block so a losing position is
    /// never kept open by the gate that exists to limit losses.
    pub fn decide(
        &self,
        signal: Signal,
        price: f64,
        account: &AccountState,
        position: &PositionState,
        verdict: Verdict,
        stop_exit: Option<CloseReason>,
    ) -> TradeDecision {
        if position.is_open {
            if let Some(reason) = stop_exit {
                let label = match reason {
                    CloseReason::StopLossInitial => "initial safety stop breached",
                    CloseReason::StopLossTrailing => "trailing stop breached",
                    CloseReason::Signal => "close requested",
                };
                return self.decision(
                    price,
                    TradeAction::Close {
                        quantity: position.quantity,
                        reason,
                    },
                    format!("{} at {:.4} (stop {:.4})", label, price, position.stop_price),
                );
            }
        }

        if let Verdict::Blocked(blocked) = verdict {
            let why = match blocked {
                BlockReason::Cooldown => "cooldown active",
                BlockReason::Drawdown => "drawdown limit reached",
            };
            return self.decision(price, TradeAction::Blocked(blocked), why.to_string());
        }

        if signal == Signal::Buy && !position.is_open {
            return match self.position_size(account, price) {
                Some(quantity) => self.decision(
                    price,
                    TradeAction::Open { quantity },
                    format!("BUY signal, sizing {:.8} at {:.4}", quantity, price),
                ),
                None => {
                    tracing::warn!("BUY signal but no balance baseline to size against");
                    self.decision(
                        price,
                        TradeAction::Hold,
                        "BUY signal but no balance baseline".to_string(),
                    )
                }
            };
        }

        if signal == Signal::Sell && position.is_open {
            return self.decision(
                price,
                TradeAction::Close {
                    quantity: position.quantity,
                    reason: CloseReason::Signal,
                },
                format!("SELL signal, closing {:.8}", position.quantity),
            );
        }

        let why = match signal {
            Signal::NoData => "no signal data this cycle",
            Signal::Sell => "SELL signal with no open position",
            Signal::Buy => "BUY signal but already in position",
            Signal::Hold => "no crossover",
        };
        self.decision(price, TradeAction::Hold, why.to_string())
    }

    fn decision(&self, price: f64, action: TradeAction, reason: String) -> TradeDecision {
        TradeDecision {
            symbol: self.symbol.clone(),
            price,
            action,
            reason,
        }
    }

    // Fixed-fraction sizing off the balance recorded at first run. Returns
    // None when there is no usable baseline.
    fn position_size(&self, account: &AccountState, price: f64) -> Option<f64> {
        let balance = account.initial_balance?;
        if balance <= 0.0 || price <= 0.0 {
            return None;
        }
        Some(balance * self.risk_per_trade_fraction / price)
    }
}
