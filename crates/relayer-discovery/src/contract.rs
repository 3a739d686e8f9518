//! ABI of the intent registry contract.
//!
//! These declarations must match the deployed `IntentStorage` contract. The
//! events are expected to index `user` as their only topic after the
//! signature; a deployment that indexes a different set of fields changes the
//! topic layout, and every log it emits fails to decode as a malformed event.

use alloy_primitives::B256;
use alloy_sol_types::{sol, SolEvent};
use relayer_types::EventKind;

sol! {
	/// Emitted when a user registers a new trading intent.
	event IntentCreated(
		address indexed user,
		uint8 platform,
		bytes32 coin,
		uint8 side,
		uint256 size,
		uint256 minPrice
	);

	/// Emitted when a user replaces the size and price of an existing intent.
	event IntentUpdated(
		address indexed user,
		uint8 platform,
		bytes32 coin,
		uint8 side,
		uint256 newSize,
		uint256 newMinPrice
	);

	/// Emitted when a user clears their intent.
	event IntentCancelled(address indexed user, uint8 platform, bytes32 coin);

	function getIntent(address user) external view returns (
		uint8 platform,
		bytes32 coin,
		uint8 side,
		uint256 size,
		uint256 minPrice,
		uint256 timestamp,
		uint8 status
	);

	function createIntent(
		uint8 platform,
		bytes32 coin,
		uint8 side,
		uint256 size,
		uint256 minPrice
	) external;

	function clearIntent() external;
}

/// Topic0 of the contract event matching `kind`.
pub fn event_signature(kind: EventKind) -> B256 {
	match kind {
		EventKind::Created => IntentCreated::SIGNATURE_HASH,
		EventKind::Updated => IntentUpdated::SIGNATURE_HASH,
		EventKind::Cancelled => IntentCancelled::SIGNATURE_HASH,
	}
}
