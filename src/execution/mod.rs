// Order execution and trade cycle module
pub mod adapter;
pub mod cycle;
pub mod decision;

pub use adapter::{ExecutionAdapter, Fill, PaperExecutionAdapter, RestExecutionAdapter};
pub use cycle::{CycleReport, TradeCycle};
pub use decision::{CloseReason, DecisionEngine, TradeAction, TradeDecision};
