// Core modules
pub mod config;
pub mod error;
pub mod execution;
pub mod feed;
pub mod models;
pub mod notify;
pub mod risk;
pub mod state;

// Re-export commonly used types
pub use error::{BotError, Result};
pub use models::*;
