//! Signing credentials for the relayer.
//!
//! The same key signs ledger transactions (intent commands) and exchange
//! actions, so both sides depend on [`AccountInterface`] rather than on a
//! concrete signer.

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, PrimitiveSignature, B256};
use async_trait::async_trait;
use thiserror::Error;

pub mod implementations {
	pub mod local;
}

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	#[error("Unknown account implementation: {0}")]
	UnknownImplementation(String),
}

#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address controlled by this account.
	fn address(&self) -> Address;

	/// Signs a 32-byte prehash (no EIP-191 prefix).
	async fn sign_hash(&self, hash: &B256) -> Result<PrimitiveSignature, AccountError>;

	/// Wallet used by ledger providers to sign outgoing transactions.
	fn wallet(&self) -> EthereumWallet;
}

/// Creates the account backend named by `implementation`.
pub fn create_account(
	implementation: &str,
	config: &toml::Value,
) -> Result<Box<dyn AccountInterface>, AccountError> {
	match implementation {
		"local" => implementations::local::create_account(config),
		other => Err(AccountError::UnknownImplementation(other.to_string())),
	}
}
