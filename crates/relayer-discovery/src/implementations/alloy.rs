//! JSON-RPC ledger backend built on Alloy.

use crate::contract::{event_signature, getIntentCall};
use crate::{DiscoveryError, LedgerInterface};
use alloy_primitives::Address;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{Filter, Log, TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use alloy_transport_http::Http;
use async_trait::async_trait;
use relayer_types::{
	decode_coin, from_wad, ConfigSchema, EventKind, Field, FieldType, Intent, IntentStatus,
	Platform, Schema, Side, ValidationError,
};

/// Ledger backend reading the intent registry over HTTP JSON-RPC.
pub struct AlloyLedger {
	provider: RootProvider<Http<reqwest::Client>>,
	contract: Address,
}

impl AlloyLedger {
	pub fn new(rpc_url: &str, contract: Address) -> Result<Self, DiscoveryError> {
		let provider = RootProvider::new_http(
			rpc_url
				.parse()
				.map_err(|e| DiscoveryError::Connection(format!("Invalid RPC URL: {}", e)))?,
		);

		Ok(Self { provider, contract })
	}
}

#[async_trait]
impl LedgerInterface for AlloyLedger {
	async fn block_number(&self) -> Result<u64, DiscoveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DiscoveryError::Rpc(format!("Failed to get block number: {}", e)))
	}

	async fn get_logs(
		&self,
		kind: EventKind,
		from_block: u64,
		to_block: u64,
	) -> Result<Vec<Log>, DiscoveryError> {
		let filter = Filter::new()
			.address(self.contract)
			.event_signature(event_signature(kind))
			.from_block(from_block)
			.to_block(to_block);

		self.provider
			.get_logs(&filter)
			.await
			.map_err(|e| DiscoveryError::Rpc(format!("Failed to get {} logs: {}", kind, e)))
	}

	async fn get_intent(&self, user: Address) -> Result<Intent, DiscoveryError> {
		let call = getIntentCall { user };
		let request = TransactionRequest::default()
			.to(self.contract)
			.input(TransactionInput::new(call.abi_encode().into()));

		let output = self
			.provider
			.call(&request)
			.await
			.map_err(|e| DiscoveryError::Rpc(format!("getIntent call failed: {}", e)))?;

		let ret = getIntentCall::abi_decode_returns(&output, true)
			.map_err(|e| DiscoveryError::Rpc(format!("Failed to decode getIntent result: {}", e)))?;

		let invalid = |e: relayer_types::IntentError| {
			DiscoveryError::Rpc(format!("Invalid intent stored for {}: {}", user, e))
		};

		let status = IntentStatus::from_raw(ret.status).map_err(invalid)?;
		// Cleared slots hold zeroes, which is a valid Long side.
		let side = Side::from_raw(ret.side).map_err(invalid)?;

		Ok(Intent {
			platform: Platform::from_raw(ret.platform),
			coin: decode_coin(&ret.coin).map_err(invalid)?,
			side,
			size: from_wad(ret.size).map_err(invalid)?,
			min_price: from_wad(ret.minPrice).map_err(invalid)?,
			timestamp: ret.timestamp.saturating_to::<u64>(),
			status,
		})
	}
}

/// Configuration schema for [`AlloyLedger`].
pub struct AlloyLedgerSchema;

impl ConfigSchema for AlloyLedgerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![
				Field::new("rpc_url", FieldType::Url),
				Field::new("contract_address", FieldType::Address),
			],
			vec![],
		)
		.validate(config)
	}
}

/// Builds an [`AlloyLedger`] from its `rpc_url` and `contract_address` settings.
pub fn create_ledger(config: &toml::Value) -> Result<Box<dyn LedgerInterface>, DiscoveryError> {
	AlloyLedgerSchema
		.validate(config)
		.map_err(|e| DiscoveryError::InvalidConfig(e.to_string()))?;

	let setting = |name: &str| {
		config
			.get(name)
			.and_then(|v| v.as_str())
			.ok_or_else(|| DiscoveryError::InvalidConfig(format!("{} is required", name)))
	};

	let contract = setting("contract_address")?
		.parse::<Address>()
		.map_err(|e| DiscoveryError::InvalidConfig(format!("Invalid contract address: {}", e)))?;

	Ok(Box::new(AlloyLedger::new(setting("rpc_url")?, contract)?))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_create_ledger() {
		let config: toml::Value = toml::from_str(
			r#"
			rpc_url = "http://localhost:8545"
			contract_address = "0x4988BCB69356B55b3Eb645Cc27F54A2B625dA43B"
			"#,
		)
		.unwrap();

		assert!(create_ledger(&config).is_ok());
	}

	#[test]
	fn test_create_ledger_rejects_missing_contract() {
		let config: toml::Value = toml::from_str(r#"rpc_url = "http://localhost:8545""#).unwrap();

		match create_ledger(&config) {
			Err(DiscoveryError::InvalidConfig(msg)) => assert!(msg.contains("contract_address")),
			Err(other) => panic!("unexpected error {}", other),
			Ok(_) => panic!("expected an error"),
		}
	}

	#[test]
	fn test_unknown_implementation() {
		let config = toml::Value::Table(Default::default());
		assert!(matches!(
			crate::create_ledger("ethers", &config),
			Err(DiscoveryError::UnknownImplementation(_))
		));
	}
}
