//! Exchange-side result types.
//!
//! Venue clients translate their wire responses into these types so the
//! executor can interpret fills, resting orders and rejections uniformly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange-assigned order id.
pub type OrderId = u64;

/// Fill details reported for an order that executed immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledOrder {
	pub total_sz: Decimal,
	pub avg_px: Decimal,
	pub oid: OrderId,
}

/// Outcome of a single sub-order within an exchange response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
	Filled(FilledOrder),
	Resting { oid: OrderId },
	Error(String),
	/// Statuses that carry no fill or resting id, e.g. a plain "success"
	/// acknowledgement for a cancel.
	Success,
}

/// Structured result of an order or cancel call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeResponse {
	/// The venue accepted the request; one status per submitted sub-order.
	Ok(Vec<OrderStatus>),
	/// The venue rejected the request as a whole.
	Err(String),
}

/// An open perpetual position. `size` is signed: positive for long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
	pub coin: String,
	pub size: Decimal,
	pub entry_px: Option<Decimal>,
	pub unrealized_pnl: Option<Decimal>,
}

/// A resting order on the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
	pub coin: String,
	pub oid: OrderId,
	pub is_buy: bool,
	pub limit_px: Decimal,
	pub sz: Decimal,
}

/// Margin, positions and open orders of the trading account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
	pub address: String,
	pub account_value: Decimal,
	pub total_margin_used: Decimal,
	pub withdrawable: Decimal,
	pub positions: Vec<Position>,
	pub open_orders: Vec<OpenOrder>,
}
