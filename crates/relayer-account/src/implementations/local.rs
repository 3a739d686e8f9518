//! Local private key wallet.

use crate::{AccountError, AccountInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, PrimitiveSignature, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relayer_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};

/// Wallet holding a private key in memory, backed by Alloy's signer.
pub struct LocalWallet {
	signer: PrivateKeySigner,
}

impl LocalWallet {
	/// Creates a wallet from a hex-encoded private key, with or without `0x`.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;

		Ok(Self { signer })
	}
}

impl std::fmt::Debug for LocalWallet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalWallet")
			.field("address", &self.signer.address())
			.finish()
	}
}

/// Configuration schema for LocalWallet.
pub struct LocalWalletSchema;

impl ConfigSchema for LocalWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![Field::new("private_key", FieldType::PrivateKey)], vec![]).validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalWallet {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_hash(&self, hash: &B256) -> Result<PrimitiveSignature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign hash: {}", e)))
	}

	fn wallet(&self) -> EthereumWallet {
		EthereumWallet::from(self.signer.clone())
	}
}

/// Builds a [`LocalWallet`] from its `private_key` setting.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalWalletSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(e.to_string()))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalWallet::new(private_key)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::keccak256;

	// First development account of anvil / hardhat.
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

	#[test]
	fn test_address_from_key() {
		let wallet = LocalWallet::new(DEV_KEY).unwrap();
		assert_eq!(wallet.address(), DEV_ADDRESS.parse::<Address>().unwrap());

		let unprefixed = LocalWallet::new(DEV_KEY.trim_start_matches("0x")).unwrap();
		assert_eq!(unprefixed.address(), wallet.address());
	}

	#[tokio::test]
	async fn test_sign_hash_recovers_signer() {
		let wallet = LocalWallet::new(DEV_KEY).unwrap();
		let hash = keccak256(b"relayer");

		let signature = wallet.sign_hash(&hash).await.unwrap();
		let recovered = signature.recover_address_from_prehash(&hash).unwrap();

		assert_eq!(recovered, wallet.address());
	}

	#[test]
	fn test_factory_rejects_bad_key() {
		let config: toml::Value = toml::from_str(r#"private_key = "0x1234""#).unwrap();
		assert!(matches!(
			create_account(&config),
			Err(AccountError::InvalidKey(_))
		));

		let missing: toml::Value = toml::from_str(r#"key = "x""#).unwrap();
		assert!(create_account(&missing).is_err());
	}

	#[test]
	fn test_factory_builds_wallet() {
		let config: toml::Value =
			toml::from_str(&format!("private_key = \"{}\"", DEV_KEY)).unwrap();
		let account = create_account(&config).unwrap();
		assert_eq!(account.address(), DEV_ADDRESS.parse::<Address>().unwrap());
	}
}
