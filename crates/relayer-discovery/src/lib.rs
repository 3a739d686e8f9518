//! Intent discovery for the relayer.
//!
//! Reads the intent registry contract through a [`LedgerInterface`] backend,
//! decodes its logs into typed [`IntentEvent`](relayer_types::IntentEvent)s
//! and tracks the block watermark in [`BlockScanner`].

use alloy_primitives::Address;
use alloy_rpc_types::Log;
use async_trait::async_trait;
use relayer_types::{EventKind, Intent};
use thiserror::Error;

pub mod contract;
pub mod decoder;
pub mod scanner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub mod implementations {
	pub mod alloy;
}

pub use decoder::decode_log;
pub use scanner::{BlockRange, BlockScanner, RetryPolicy, ScanBatch, ScannerConfig};

#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("Connection error: {0}")]
	Connection(String),
	#[error("RPC error: {0}")]
	Rpc(String),
	#[error("Malformed {kind} event: {reason}")]
	MalformedEvent { kind: EventKind, reason: String },
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("Unknown ledger implementation: {0}")]
	UnknownImplementation(String),
}

/// Read access to the chain hosting the intent registry.
#[async_trait]
pub trait LedgerInterface: Send + Sync {
	/// Current chain height.
	async fn block_number(&self) -> Result<u64, DiscoveryError>;

	/// Logs of one event kind emitted by the registry in `[from_block, to_block]`.
	async fn get_logs(
		&self,
		kind: EventKind,
		from_block: u64,
		to_block: u64,
	) -> Result<Vec<Log>, DiscoveryError>;

	/// Stored intent of `user`. Users that never wrote one come back with
	/// status `None`.
	async fn get_intent(&self, user: Address) -> Result<Intent, DiscoveryError>;
}

/// Creates the ledger backend named by `implementation`.
pub fn create_ledger(
	implementation: &str,
	config: &toml::Value,
) -> Result<Box<dyn LedgerInterface>, DiscoveryError> {
	match implementation {
		"alloy" => implementations::alloy::create_ledger(config),
		other => Err(DiscoveryError::UnknownImplementation(other.to_string())),
	}
}
