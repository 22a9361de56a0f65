use crate::state::PositionState;

/// Outcome of a stop update for one price observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopEvent {
    /// Stop ratcheted upward. Informational, not an exit.
    Raised { from: f64, to: f64 },
    /// Price fell through the fixed safety stop before trailing began.
    InitialStopHit { safety_stop: f64 },
}

/// Monotone trailing stop for the single open position
///
/// The position has to earn the right to trail: until it is up
/// `profit_trigger_fraction` from entry only the fixed safety stop below
/// the entry price applies and the stored stop does not move. Once
/// trailing begins the stop only ever rises.
#[derive(Debug, Clone)]
pub struct TrailingStopEngine {
    pub trailing_fraction: f64,
    pub profit_trigger_fraction: f64,
    pub initial_stop_fraction: f64,
}

impl Default for TrailingStopEngine {
    fn default() -> Self {
        Self {
            trailing_fraction: 0.005,      // trail 0.5% below price
            profit_trigger_fraction: 0.01, // start trailing at +1%
            initial_stop_fraction: 0.01,   // fixed -1% stop until then
        }
    }
}

impl TrailingStopEngine {
    /// Update the stop for the current price. No-op for a flat book.
    pub fn update(&self, position: &mut PositionState, current_price: f64) -> Option<StopEvent> {
        if !position.is_open {
            return None;
        }

        let profit_pct = (current_price - position.entry_price) / position.entry_price;

        if profit_pct < self.profit_trigger_fraction {
            let safety_stop = position.entry_price * (1.0 - self.initial_stop_fraction);
            if current_price < safety_stop {
                return Some(StopEvent::InitialStopHit { safety_stop });
            }
            return None;
        }

        let candidate = current_price * (1.0 - self.trailing_fraction);
        if candidate > position.stop_price {
            let from = position.stop_price;
            position.stop_price = candidate;
            tracing::info!(
                "Trailing stop raised {:.4} -> {:.4} (price {:.4})",
                from,
                candidate,
                current_price
            );
            return Some(StopEvent::Raised {
                from,
                to: candidate,
            });
        }

        None
    }

    /// Exit check the caller runs after [`update`](Self::update): a stop
    /// set in any prior cycle still triggers even if it did not move
    /// this cycle.
    pub fn stop_hit(&self, position: &PositionState, current_price: f64) -> bool {
        position.is_open && position.stop_price > 0.0 && current_price < position.stop_price
    }
}
