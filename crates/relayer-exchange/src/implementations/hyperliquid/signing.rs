//! L1 action signing.
//!
//! An action is msgpack-encoded, suffixed with the nonce and vault marker and
//! hashed; the hash is wrapped in an EIP-712 `Agent` struct (the phantom
//! agent) and signed under the fixed `Exchange` domain.

use super::wire::{Action, SignatureWire};
use crate::ExchangeError;
use alloy_primitives::{keccak256, Address, PrimitiveSignature, B256};
use alloy_sol_types::{eip712_domain, sol, Eip712Domain, SolStruct};
use relayer_account::AccountInterface;

sol! {
	#[derive(Debug)]
	struct Agent {
		string source;
		bytes32 connectionId;
	}
}

const EXCHANGE_DOMAIN: Eip712Domain = eip712_domain! {
	name: "Exchange",
	version: "1",
	chain_id: 1337,
	verifying_contract: Address::ZERO,
};

/// Hash identifying an action, nonce and (absent) vault.
pub fn action_hash(action: &Action, nonce: u64) -> Result<B256, ExchangeError> {
	let mut bytes = rmp_serde::to_vec_named(action)
		.map_err(|e| ExchangeError::Signing(format!("Failed to encode action: {}", e)))?;
	bytes.extend_from_slice(&nonce.to_be_bytes());
	// No vault address.
	bytes.push(0);

	Ok(keccak256(bytes))
}

/// EIP-712 signing hash of the phantom agent for `connection_id`.
pub fn agent_signing_hash(connection_id: B256, mainnet: bool) -> B256 {
	let agent = Agent {
		source: if mainnet { "a" } else { "b" }.to_string(),
		connectionId: connection_id,
	};
	agent.eip712_signing_hash(&EXCHANGE_DOMAIN)
}

/// Signs `action` at `nonce` with the relayer account.
pub async fn sign_l1_action(
	account: &dyn AccountInterface,
	action: &Action,
	nonce: u64,
	mainnet: bool,
) -> Result<SignatureWire, ExchangeError> {
	let hash = agent_signing_hash(action_hash(action, nonce)?, mainnet);
	let signature = account
		.sign_hash(&hash)
		.await
		.map_err(|e| ExchangeError::Signing(e.to_string()))?;

	Ok(signature_to_wire(&signature))
}

fn signature_to_wire(signature: &PrimitiveSignature) -> SignatureWire {
	SignatureWire {
		r: format!("0x{}", hex::encode(signature.r().to_be_bytes::<32>())),
		s: format!("0x{}", hex::encode(signature.s().to_be_bytes::<32>())),
		v: 27 + u64::from(signature.v()),
	}
}
