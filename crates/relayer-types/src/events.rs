//! Decoded intent events.
//!
//! One [`IntentEvent`] is produced per contract log. It is consumed once by
//! the dispatcher and then dropped.

use crate::intent::{Platform, Side};
use alloy_primitives::{Address, B256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three contract events the relayer reacts to, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
	Created,
	Updated,
	Cancelled,
}

impl EventKind {
	/// Fixed order in which event kinds are fetched and dispatched for a range.
	pub const SCAN_ORDER: [EventKind; 3] =
		[EventKind::Created, EventKind::Updated, EventKind::Cancelled];
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EventKind::Created => write!(f, "Created"),
			EventKind::Updated => write!(f, "Updated"),
			EventKind::Cancelled => write!(f, "Cancelled"),
		}
	}
}

/// Hash of the transaction that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub B256);

impl TransactionHash {
	/// Shortened form for log lines.
	pub fn short(&self) -> String {
		let hash_str = hex::encode(self.0);
		format!("0x{}..", &hash_str[..8])
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		TransactionHash(hash)
	}
}

/// Order parameters carried by create and update events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderParams {
	pub side: Side,
	pub size: Decimal,
	pub min_price: Decimal,
}

/// What the intent owner asked for.
///
/// `Updated` carries the new size and price, not the previous ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentAction {
	Created(OrderParams),
	Updated(OrderParams),
	Cancelled,
}

impl IntentAction {
	pub fn kind(&self) -> EventKind {
		match self {
			IntentAction::Created(_) => EventKind::Created,
			IntentAction::Updated(_) => EventKind::Updated,
			IntentAction::Cancelled => EventKind::Cancelled,
		}
	}
}

/// A contract log decoded into a typed intent event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEvent {
	pub tx_hash: TransactionHash,
	pub block_number: Option<u64>,
	pub log_index: Option<u64>,
	pub user: Address,
	pub platform: Platform,
	pub coin: String,
	pub action: IntentAction,
}

impl IntentEvent {
	pub fn kind(&self) -> EventKind {
		self.action.kind()
	}
}
