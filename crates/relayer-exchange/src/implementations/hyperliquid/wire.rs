//! Hyperliquid request and response wire types.
//!
//! Field order of the action types is part of the signature: actions are
//! msgpack-encoded with named fields before hashing, so the structs below must
//! serialize exactly in the order the venue expects.

use relayer_types::{ExchangeResponse, FilledOrder, OrderStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Signed action body posted to `/exchange`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
	Order(BulkOrder),
	Cancel(BulkCancel),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkOrder {
	pub orders: Vec<OrderWire>,
	pub grouping: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderWire {
	#[serde(rename = "a")]
	pub asset: u32,
	#[serde(rename = "b")]
	pub is_buy: bool,
	#[serde(rename = "p")]
	pub limit_px: String,
	#[serde(rename = "s")]
	pub sz: String,
	#[serde(rename = "r")]
	pub reduce_only: bool,
	#[serde(rename = "t")]
	pub order_type: OrderTypeWire,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum OrderTypeWire {
	Limit(LimitOrderType),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LimitOrderType {
	pub tif: String,
}

impl OrderTypeWire {
	/// Immediate-or-cancel limit, the venue's building block for market orders.
	pub fn ioc() -> Self {
		OrderTypeWire::Limit(LimitOrderType {
			tif: "Ioc".to_string(),
		})
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkCancel {
	pub cancels: Vec<CancelWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CancelWire {
	#[serde(rename = "a")]
	pub asset: u32,
	#[serde(rename = "o")]
	pub oid: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignatureWire {
	pub r: String,
	pub s: String,
	pub v: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
	pub action: Action,
	pub nonce: u64,
	pub signature: SignatureWire,
	pub vault_address: Option<String>,
}

/// `/info` request bodies.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
	Meta,
	AllMids,
	ClearinghouseState { user: String },
	OpenOrders { user: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
	pub universe: Vec<AssetInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
	pub name: String,
	pub sz_decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
	pub margin_summary: MarginSummary,
	pub withdrawable: String,
	#[serde(default)]
	pub asset_positions: Vec<AssetPosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
	pub account_value: String,
	pub total_margin_used: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
	pub position: PositionWire,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionWire {
	pub coin: String,
	pub szi: String,
	pub entry_px: Option<String>,
	pub unrealized_pnl: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderWire {
	pub coin: String,
	pub oid: u64,
	/// "B" for bids, "A" for asks.
	pub side: String,
	pub limit_px: String,
	pub sz: String,
}

/// Top-level `/exchange` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status", content = "response", rename_all = "camelCase")]
pub enum ExchangeResponseWire {
	Ok(OkResponse),
	Err(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OkResponse {
	#[serde(rename = "type")]
	pub kind: String,
	pub data: Option<StatusData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
	pub statuses: Vec<StatusWire>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusWire {
	Tagged(TaggedStatus),
	/// Bare acknowledgements such as `"success"` or `"waitingForFill"`.
	Plain(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaggedStatus {
	Filled(FilledWire),
	Resting(RestingWire),
	Error(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilledWire {
	pub total_sz: String,
	pub avg_px: String,
	pub oid: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestingWire {
	pub oid: u64,
}

/// Parses a venue decimal string.
pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
	Decimal::from_str(value)
		.or_else(|_| Decimal::from_scientific(value))
		.map_err(|e| format!("Invalid {} '{}': {}", field, value, e))
}

/// Formats a decimal the way the venue hashes it: no trailing zeros, no `-0`.
pub fn to_wire(value: Decimal) -> String {
	let normalized = value.normalize();
	if normalized.is_zero() {
		"0".to_string()
	} else {
		normalized.to_string()
	}
}

impl TryFrom<ExchangeResponseWire> for ExchangeResponse {
	type Error = String;

	fn try_from(wire: ExchangeResponseWire) -> Result<Self, Self::Error> {
		let ok = match wire {
			ExchangeResponseWire::Err(message) => return Ok(ExchangeResponse::Err(message)),
			ExchangeResponseWire::Ok(ok) => ok,
		};

		let statuses = ok
			.data
			.map(|data| data.statuses)
			.unwrap_or_default()
			.into_iter()
			.map(|status| match status {
				StatusWire::Tagged(TaggedStatus::Filled(filled)) => Ok(OrderStatus::Filled(FilledOrder {
					total_sz: parse_decimal("totalSz", &filled.total_sz)?,
					avg_px: parse_decimal("avgPx", &filled.avg_px)?,
					oid: filled.oid,
				})),
				StatusWire::Tagged(TaggedStatus::Resting(resting)) => {
					Ok(OrderStatus::Resting { oid: resting.oid })
				}
				StatusWire::Tagged(TaggedStatus::Error(message)) => Ok(OrderStatus::Error(message)),
				StatusWire::Plain(_) => Ok(OrderStatus::Success),
			})
			.collect::<Result<Vec<_>, String>>()?;

		Ok(ExchangeResponse::Ok(statuses))
	}
}
