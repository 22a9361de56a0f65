use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Account-level risk bookkeeping, persisted across cycles
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccountState {
    /// Baseline balance, set once on the first successful balance read
    pub initial_balance: Option<f64>,
    /// Sum of absolute realized losses since the last external reset
    pub cumulative_loss: f64,
    /// Trading is blocked while this lies in the future
    pub cooldown_until: Option<DateTime<Utc>>,
}

/// The single open position (or lack of one), persisted across cycles
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PositionState {
    #[serde(rename = "position_open")]
    pub is_open: bool,
    pub entry_price: f64,
    /// Current stop level. Never decreases while the position stays open.
    #[serde(rename = "last_stop_price")]
    pub stop_price: f64,
    #[serde(rename = "position_qty")]
    pub quantity: f64,
}

impl PositionState {
    /// Record a filled buy: entry at the fill price, stop at the fixed
    /// initial distance below it.
    pub fn open(&mut self, fill_price: f64, quantity: f64, initial_stop_fraction: f64) {
        self.is_open = true;
        self.entry_price = fill_price;
        self.quantity = quantity;
        self.stop_price = fill_price * (1.0 - initial_stop_fraction);
    }

    /// Zero out all fields after a close.
    pub fn clear(&mut self) {
        *self = PositionState::default();
    }
}

/// Full persisted bot state: account bookkeeping plus position record.
///
/// Serializes flat so the on-disk JSON keeps the original field layout
/// (`initial_balance`, `cumulative_loss`, `cooldown_until`,
/// `position_open`, `entry_price`, `last_stop_price`, `position_qty`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BotState {
    #[serde(flatten)]
    pub account: AccountState,
    #[serde(flatten)]
    pub position: PositionState,
}

impl BotState {
    /// Settle a filled close: realize PnL, accrue losses, clear the
    /// position. Returns the realized PnL.
    pub fn settle_close(&mut self, exit_price: f64) -> f64 {
        let pnl = (exit_price - self.position.entry_price) * self.position.quantity;
        if pnl < 0.0 {
            self.account.cumulative_loss += -pnl;
        }
        self.position.clear();
        pnl
    }
}

/// JSON file store for [`BotState`]
///
/// There is exactly one writer per state file (the external scheduler
/// guarantees non-overlapping cycles), so no locking. Writes go to a
/// temp file first and are renamed into place, so a crash mid-cycle
/// leaves the previous state intact.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state.
    ///
    /// A missing file is a normal first run and yields the defaults. An
    /// unreadable or unparsable file also falls back to the defaults so
    /// one bad write cannot wedge the bot permanently; the recovery is
    /// logged loudly because it forgets any open position.
    pub fn load(&self) -> BotState {
        if !self.path.exists() {
            tracing::info!(
                "No state file at {}, starting fresh",
                self.path.display()
            );
            return BotState::default();
        }

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    "State file {} unreadable ({e}), starting from defaults",
                    self.path.display()
                );
                return BotState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "State file {} unparsable ({e}), starting from defaults",
                    self.path.display()
                );
                BotState::default()
            }
        }
    }

    /// Persist the state atomically: write to a temp file, then rename.
    pub fn save(&self, state: &BotState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| BotError::PersistenceFailure(format!("serialize state: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| BotError::PersistenceFailure(format!("write temp state file: {e}")))?;

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            // Clean up the temp file so a failed save leaves no debris
            let _ = fs::remove_file(&tmp_path);
            BotError::PersistenceFailure(format!("atomic rename failed: {e}"))
        })?;

        tracing::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_defaults_from_empty_json() {
        let state: BotState = serde_json::from_str("{}").unwrap();

        assert_eq!(state.account.initial_balance, None);
        assert_eq!(state.account.cumulative_loss, 0.0);
        assert_eq!(state.account.cooldown_until, None);
        assert!(!state.position.is_open);
        assert_eq!(state.position.entry_price, 0.0);
        assert_eq!(state.position.stop_price, 0.0);
        assert_eq!(state.position.quantity, 0.0);
    }

    #[test]
    fn test_on_disk_field_names() {
        let mut state = BotState::default();
        state.account.initial_balance = Some(1000.0);
        state.position.open(100.0, 0.5, 0.01);

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"initial_balance\""));
        assert!(json.contains("\"cumulative_loss\""));
        assert!(json.contains("\"cooldown_until\""));
        assert!(json.contains("\"position_open\""));
        assert!(json.contains("\"entry_price\""));
        assert!(json.contains("\"last_stop_price\""));
        assert!(json.contains("\"position_qty\""));
    }

    #[test]
    fn test_cooldown_round_trips_as_rfc3339() {
        let mut state = BotState::default();
        state.account.cooldown_until = Some(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("2025-03-01T12:00:00Z"));

        let back: BotState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.account.cooldown_until, state.account.cooldown_until);
    }

    #[test]
    fn test_open_sets_initial_stop() {
        let mut position = PositionState::default();
        position.open(200.0, 0.25, 0.01);

        assert!(position.is_open);
        assert_eq!(position.entry_price, 200.0);
        assert_eq!(position.quantity, 0.25);
        assert!((position.stop_price - 198.0).abs() < 1e-9); // 200 * 0.99
    }

    #[test]
    fn test_settle_close_profit_leaves_loss_untouched() {
        let mut state = BotState::default();
        state.position.open(100.0, 2.0, 0.01);

        let pnl = state.settle_close(110.0);

        assert_eq!(pnl, 20.0); // 2 * (110 - 100)
        assert_eq!(state.account.cumulative_loss, 0.0);
        assert!(!state.position.is_open);
        assert_eq!(state.position.entry_price, 0.0);
        assert_eq!(state.position.quantity, 0.0);
        assert_eq!(state.position.stop_price, 0.0);
    }

    #[test]
    fn test_settle_close_loss_accrues() {
        let mut state = BotState::default();
        state.position.open(100.0, 2.0, 0.01);

        let pnl = state.settle_close(95.0);

        assert_eq!(pnl, -10.0); // 2 * (95 - 100)
        assert_eq!(state.account.cumulative_loss, 10.0);
        assert!(!state.position.is_open);

        // A second losing trade keeps accruing, never resets
        state.position.open(50.0, 1.0, 0.01);
        state.settle_close(48.0);
        assert_eq!(state.account.cumulative_loss, 12.0);
    }

    #[test]
    fn test_store_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let state = store.load();
        assert_eq!(state, BotState::default());
    }

    #[test]
    fn test_store_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = BotState::default();
        state.account.initial_balance = Some(1500.0);
        state.account.cumulative_loss = 12.5;
        state.position.open(104.0, 0.1, 0.01);

        store.save(&state).unwrap();
        let loaded = store.load();

        assert_eq!(loaded, state);
        // No temp file left behind after a successful save
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_store_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = BotState::default();
        state.account.cumulative_loss = 5.0;
        store.save(&state).unwrap();

        state.account.cumulative_loss = 7.5;
        store.save(&state).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.account.cumulative_loss, 7.5);
    }

    #[test]
    fn test_store_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json{{").unwrap();

        let state = StateStore::new(&path).load();
        assert_eq!(state, BotState::default());
    }

    #[test]
    fn test_store_accepts_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{
                "initial_balance": 100.0,
                "cumulative_loss": 6.0,
                "cooldown_until": null,
                "position_open": true,
                "entry_price": 100.0,
                "last_stop_price": 104.475,
                "position_qty": 0.5
            }"#,
        )
        .unwrap();

        let state = StateStore::new(&path).load();
        assert_eq!(state.account.initial_balance, Some(100.0));
        assert_eq!(state.account.cumulative_loss, 6.0);
        assert!(state.position.is_open);
        assert_eq!(state.position.stop_price, 104.475);
        assert_eq!(state.position.quantity, 0.5);
    }
}
