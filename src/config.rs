//! Layered configuration for the OMS core.
//!
//! A `Config` merges an optional YAML file over struct defaults, following
//! this crate's `risk`/`store`/`poller`/`reconciler`/`monitor` sectioning.
//! No environment-variable coupling is required at the core boundary; binary
//! targets embedding this crate are free to layer their own env overrides on
//! top of the loaded `Config`.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file's contents could not be parsed as YAML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_yaml_bw::Error,
    },

    /// A loaded configuration value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_max_risk_per_trade() -> Decimal {
    dec!(0.02)
}
fn default_max_daily_loss() -> Decimal {
    dec!(0.06)
}
fn default_max_drawdown() -> Decimal {
    dec!(0.15)
}
fn default_max_positions() -> u32 {
    5
}
fn default_min_risk_reward() -> Decimal {
    dec!(2.0)
}
fn default_max_position_size() -> u32 {
    1000
}
fn default_max_quantity_per_order() -> i64 {
    10_000
}
fn default_max_price_deviation_pct() -> Decimal {
    dec!(0.10)
}
fn default_max_order_to_position_ratio() -> u32 {
    3
}
fn default_mis_leverage() -> u32 {
    5
}

/// Risk limits enforced by the `PreTradeValidator` and `RiskMonitor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Cap on `|entry-SL|*qty / balance`.
    #[serde(default = "default_max_risk_per_trade")]
    pub max_risk_per_trade: Decimal,
    /// Cap on `|realized_today| / balance`.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Cap on `(peak-current)/peak`.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,
    /// Cap on open positions when opening a new symbol.
    #[serde(default = "default_max_positions")]
    pub max_positions: u32,
    /// Floor on `reward/risk`.
    #[serde(default = "default_min_risk_reward")]
    pub min_risk_reward: Decimal,
    /// Reserved per-symbol position size cap.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: u32,
    /// Per-order quantity cap.
    #[serde(default = "default_max_quantity_per_order")]
    pub max_quantity_per_order: i64,
    /// LTP sanity window, when a last-traded price is available.
    #[serde(default = "default_max_price_deviation_pct")]
    pub max_price_deviation_pct: Decimal,
    /// Cap on active orders per open position.
    #[serde(default = "default_max_order_to_position_ratio")]
    pub max_order_to_position_ratio: u32,
    /// Divisor on required notional for MIS orders.
    #[serde(default = "default_mis_leverage")]
    pub mis_leverage: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_per_trade: default_max_risk_per_trade(),
            max_daily_loss: default_max_daily_loss(),
            max_drawdown: default_max_drawdown(),
            max_positions: default_max_positions(),
            min_risk_reward: default_min_risk_reward(),
            max_position_size: default_max_position_size(),
            max_quantity_per_order: default_max_quantity_per_order(),
            max_price_deviation_pct: default_max_price_deviation_pct(),
            max_order_to_position_ratio: default_max_order_to_position_ratio(),
            mis_leverage: default_mis_leverage(),
        }
    }
}

/// Selects the `Store` backend. Only `InMemory` is implemented; the other
/// variants are reserved for a future durable backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// The in-process, lock-protected reference `Store`.
    #[default]
    InMemory,
    /// Reserved for a future `PostgreSQL`-backed `Store`.
    Postgres,
}

/// Store section: backend selection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Which `Store` implementation to construct.
    pub backend: StoreBackend,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_poll_backoff_empty_ms() -> u64 {
    5_000
}
fn default_poll_backoff_error_ms() -> u64 {
    5_000
}

/// `OrderPoller` cadence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Steady-state poll interval.
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    /// Interval to back off to when a cycle finds no active orders.
    #[serde(default = "default_poll_backoff_empty_ms")]
    pub backoff_empty_ms: u64,
    /// Minimum interval to back off to after an error.
    #[serde(default = "default_poll_backoff_error_ms")]
    pub backoff_error_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            backoff_empty_ms: default_poll_backoff_empty_ms(),
            backoff_error_ms: default_poll_backoff_error_ms(),
        }
    }
}

fn default_reconcile_interval_ms() -> u64 {
    30_000
}
fn default_reconcile_backoff_error_ms() -> u64 {
    60_000
}

/// `Reconciler` cadence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Steady-state reconciliation interval.
    #[serde(default = "default_reconcile_interval_ms")]
    pub interval_ms: u64,
    /// Minimum interval to back off to after an error.
    #[serde(default = "default_reconcile_backoff_error_ms")]
    pub backoff_error_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_reconcile_interval_ms(),
            backoff_error_ms: default_reconcile_backoff_error_ms(),
        }
    }
}

fn default_monitor_cadence_ms() -> u64 {
    2_000
}
fn default_max_position_loss_pct() -> Decimal {
    dec!(0.03)
}

/// `RiskMonitor` cadence and position-level loss limit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Evaluation cadence.
    #[serde(default = "default_monitor_cadence_ms")]
    pub cadence_ms: u64,
    /// Per-position loss limit as a fraction of account balance.
    #[serde(default = "default_max_position_loss_pct")]
    pub max_position_loss_pct: Decimal,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cadence_ms: default_monitor_cadence_ms(),
            max_position_loss_pct: default_max_position_loss_pct(),
        }
    }
}

/// Root configuration, loaded once at startup and threaded through every
/// component that needs it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pre-trade risk gate limits.
    pub risk: RiskConfig,
    /// Persistence backend selection.
    pub store: StoreConfig,
    /// `OrderPoller` cadence.
    pub poller: PollerConfig,
    /// `Reconciler` cadence.
    pub reconciler: ReconcilerConfig,
    /// `RiskMonitor` cadence and limits.
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from an optional YAML file, merged over defaults.
    /// A missing file is not an error: defaults apply unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file exists but cannot be read,
    /// or [`ConfigError::Parse`] if its contents are not valid YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml_bw::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.risk.max_risk_per_trade, dec!(0.02));
        assert_eq!(config.risk.max_daily_loss, dec!(0.06));
        assert_eq!(config.risk.max_positions, 5);
        assert_eq!(config.poller.interval_ms, 1_000);
        assert_eq!(config.reconciler.interval_ms, 30_000);
        assert_eq!(config.monitor.cadence_ms, 2_000);
        assert_eq!(config.store.backend, StoreBackend::InMemory);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let config = Config::load("/nonexistent/path/config.yaml").unwrap();
        assert_eq!(config.risk.max_positions, 5);
    }

    #[test]
    fn load_parses_partial_override() {
        let dir = std::env::temp_dir().join(format!("oms-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "risk:\n  max_positions: 10\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.risk.max_positions, 10);
        assert_eq!(config.risk.max_daily_loss, dec!(0.06));

        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }
}
