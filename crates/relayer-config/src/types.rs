//! Configuration types for the relayer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete relayer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Scan loop settings
	#[serde(default)]
	pub relayer: RelayerSettings,
	/// Ledger RPC backend
	pub ledger: BackendConfig,
	/// Signing credential
	pub account: BackendConfig,
	/// Exchange venue backend
	pub exchange: BackendConfig,
	/// Replay guard bounds
	#[serde(default)]
	pub replay_guard: ReplayGuardConfig,
	/// Ledger RPC retry policy
	#[serde(default)]
	pub retry: RetryConfig,
	/// Order execution settings
	#[serde(default)]
	pub executor: ExecutorConfig,
}

/// Scan loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayerSettings {
	#[serde(default = "default_name")]
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	/// Fixed delay between idle checks of the chain head.
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
	/// First block to scan. When unset, scanning starts after the current head.
	pub start_block: Option<u64>,
	/// Upper bound on blocks per log query. When unset the whole pending range
	/// is fetched at once.
	pub max_block_range: Option<u64>,
}

impl RelayerSettings {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}
}

impl Default for RelayerSettings {
	fn default() -> Self {
		Self {
			name: default_name(),
			log_level: default_log_level(),
			poll_interval_secs: default_poll_interval_secs(),
			start_block: None,
			max_block_range: None,
		}
	}
}

/// Selects a backend implementation and carries its raw settings table.
///
/// The table is validated by the chosen implementation's schema when the
/// backend is created.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	pub implementation: String,
	pub config: toml::Value,
}

/// Bounds on the set of already-processed transaction hashes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayGuardConfig {
	#[serde(default = "default_guard_capacity")]
	pub capacity: usize,
	#[serde(default = "default_guard_ttl_secs")]
	pub ttl_secs: u64,
}

impl ReplayGuardConfig {
	pub fn ttl(&self) -> Duration {
		Duration::from_secs(self.ttl_secs)
	}
}

impl Default for ReplayGuardConfig {
	fn default() -> Self {
		Self {
			capacity: default_guard_capacity(),
			ttl_secs: default_guard_ttl_secs(),
		}
	}
}

/// Exponential backoff applied to ledger RPC calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
	#[serde(default = "default_initial_interval_ms")]
	pub initial_interval_ms: u64,
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
	/// Total time spent retrying one call before the error is treated as fatal.
	#[serde(default = "default_max_elapsed_secs")]
	pub max_elapsed_secs: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			initial_interval_ms: default_initial_interval_ms(),
			max_interval_ms: default_max_interval_ms(),
			max_elapsed_secs: default_max_elapsed_secs(),
		}
	}
}

/// Order execution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
	/// Fraction of the mid price a market order may move, `0.01` is 1%.
	#[serde(default = "default_slippage")]
	pub slippage: Decimal,
}

impl Default for ExecutorConfig {
	fn default() -> Self {
		Self {
			slippage: default_slippage(),
		}
	}
}

fn default_name() -> String {
	"intent-relayer".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_poll_interval_secs() -> u64 {
	3
}

fn default_guard_capacity() -> usize {
	100_000
}

fn default_guard_ttl_secs() -> u64 {
	7 * 24 * 60 * 60
}

fn default_initial_interval_ms() -> u64 {
	500
}

fn default_max_interval_ms() -> u64 {
	10_000
}

fn default_max_elapsed_secs() -> u64 {
	120
}

fn default_slippage() -> Decimal {
	Decimal::new(1, 2)
}
