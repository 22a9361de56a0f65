use chrono::{DateTime, Duration, Utc};

use crate::state::AccountState;

/// Why trading is blocked this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    Cooldown,
    Drawdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked(BlockReason),
}

/// Drawdown circuit breaker with a time-based cooldown
///
/// Runs before the decision each cycle, and again after it so a loss
/// realized this cycle starts the cooldown for the next one.
#[derive(Debug, Clone)]
pub struct RiskGovernor {
    pub max_drawdown_fraction: f64,
    pub cooldown_hours: i64,
}

impl Default for RiskGovernor {
    fn default() -> Self {
        Self {
            max_drawdown_fraction: 0.05, // -5% of the baseline balance
            cooldown_hours: 24,
        }
    }
}

impl RiskGovernor {
    /// Decide whether trading is permitted right now.
    ///
    /// An expired cooldown is cleared on the in-memory copy; a tripped
    /// drawdown limit sets a fresh `cooldown_until` before blocking.
    pub fn evaluate(&self, account: &mut AccountState, now: DateTime<Utc>) -> Verdict {
        if let Some(until) = account.cooldown_until {
            if now < until {
                return Verdict::Blocked(BlockReason::Cooldown);
            }
            account.cooldown_until = None;
            tracing::info!("Cooldown expired, trading re-enabled");
        }

        if let Some(balance) = account.initial_balance {
            if balance > 0.0 && account.cumulative_loss >= balance * self.max_drawdown_fraction {
                let until = now + Duration::hours(self.cooldown_hours);
                account.cooldown_until = Some(until);
                tracing::warn!(
                    "Drawdown limit hit ({:.2} lost of {:.2} baseline), cooling down until {}",
                    account.cumulative_loss,
                    balance,
                    until
                );
                return Verdict::Blocked(BlockReason::Drawdown);
            }
        }

        Verdict::Allowed
    }
}
