//! Decoding of raw contract logs into [`IntentEvent`]s.

use crate::contract::{IntentCancelled, IntentCreated, IntentUpdated};
use crate::DiscoveryError;
use alloy_primitives::U256;
use alloy_rpc_types::Log;
use alloy_sol_types::SolEvent;
use relayer_types::{
	decode_coin, from_wad, EventKind, IntentAction, IntentEvent, OrderParams, Platform, Side,
	TransactionHash,
};

/// Decodes `log` as an event of the given kind.
///
/// Any failure (missing transaction hash, ABI mismatch, undecodable coin or
/// side, amount out of range) yields [`DiscoveryError::MalformedEvent`] so the
/// caller can skip the log and continue with the rest of the batch.
pub fn decode_log(kind: EventKind, log: &Log) -> Result<IntentEvent, DiscoveryError> {
	let malformed = |reason: String| DiscoveryError::MalformedEvent { kind, reason };

	let tx_hash = log
		.transaction_hash
		.map(TransactionHash::from)
		.ok_or_else(|| malformed("log has no transaction hash".to_string()))?;

	let (user, platform, coin, action) = match kind {
		EventKind::Created => {
			let event = IntentCreated::decode_log(&log.inner, true)
				.map_err(|e| malformed(format!("Failed to decode event: {}", e)))?;
			let params = order_params(event.side, event.size, event.minPrice).map_err(malformed)?;
			(event.user, event.platform, event.coin, IntentAction::Created(params))
		}
		EventKind::Updated => {
			let event = IntentUpdated::decode_log(&log.inner, true)
				.map_err(|e| malformed(format!("Failed to decode event: {}", e)))?;
			let params =
				order_params(event.side, event.newSize, event.newMinPrice).map_err(malformed)?;
			(event.user, event.platform, event.coin, IntentAction::Updated(params))
		}
		EventKind::Cancelled => {
			let event = IntentCancelled::decode_log(&log.inner, true)
				.map_err(|e| malformed(format!("Failed to decode event: {}", e)))?;
			(event.user, event.platform, event.coin, IntentAction::Cancelled)
		}
	};

	let coin = decode_coin(&coin).map_err(|e| malformed(e.to_string()))?;

	Ok(IntentEvent {
		tx_hash,
		block_number: log.block_number,
		log_index: log.log_index,
		user,
		platform: Platform::from_raw(platform),
		coin,
		action,
	})
}

fn order_params(side: u8, size: U256, min_price: U256) -> Result<OrderParams, String> {
	Ok(OrderParams {
		side: Side::from_raw(side).map_err(|e| e.to_string())?,
		size: from_wad(size).map_err(|e| e.to_string())?,
		min_price: from_wad(min_price).map_err(|e| e.to_string())?,
	})
}
