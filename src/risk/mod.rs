// Risk management module
pub mod governor;
pub mod trailing_stop;

pub use governor::{BlockReason, RiskGovernor, Verdict};
pub use trailing_stop::{StopEvent, TrailingStopEngine};
