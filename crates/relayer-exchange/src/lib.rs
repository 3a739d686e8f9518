//! Exchange execution for the relayer.
//!
//! [`ExchangeInterface`] is the raw venue client: it places market orders,
//! closes positions and cancels orders, returning the venue's structured
//! response. [`IntentExecutor`] sits on top of it and turns those responses
//! into logged [`ExecutionOutcome`]s for the dispatcher.

use async_trait::async_trait;
use relayer_account::AccountInterface;
use relayer_types::{AccountSummary, ExchangeResponse, OrderId, Position};
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;

pub mod executor;

pub mod implementations {
	pub mod hyperliquid;
}

pub use executor::{ExecutionOutcome, IntentExecutor, OrderExecutor};

#[derive(Debug, Error)]
pub enum ExchangeError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Unexpected response: {0}")]
	InvalidResponse(String),
	#[error("Unknown asset: {0}")]
	UnknownAsset(String),
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
	#[error("Signing error: {0}")]
	Signing(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
	#[error("Unknown exchange implementation: {0}")]
	UnknownImplementation(String),
}

/// Client for a perpetuals venue.
///
/// Venue-level rejections come back as [`ExchangeResponse::Err`]; only
/// transport, encoding and signing problems are reported as [`ExchangeError`].
#[async_trait]
pub trait ExchangeInterface: Send + Sync {
	/// Places an immediate market order. Without `px_hint` the current mid
	/// price is used as reference; the limit is then moved by `slippage`.
	async fn market_open(
		&self,
		coin: &str,
		is_buy: bool,
		size: Decimal,
		px_hint: Option<Decimal>,
		slippage: Decimal,
	) -> Result<ExchangeResponse, ExchangeError>;

	/// Closes the whole open position in `coin`.
	async fn market_close(
		&self,
		coin: &str,
		slippage: Decimal,
	) -> Result<ExchangeResponse, ExchangeError>;

	async fn cancel(&self, coin: &str, oid: OrderId) -> Result<ExchangeResponse, ExchangeError>;

	/// Currently open position in `coin`, if any.
	async fn open_position(&self, coin: &str) -> Result<Option<Position>, ExchangeError>;

	async fn account_summary(&self) -> Result<AccountSummary, ExchangeError>;
}

/// Creates the exchange backend named by `implementation`, signing with `account`.
pub fn create_exchange(
	implementation: &str,
	config: &toml::Value,
	account: Arc<dyn AccountInterface>,
) -> Result<Box<dyn ExchangeInterface>, ExchangeError> {
	match implementation {
		"hyperliquid" => implementations::hyperliquid::create_exchange(config, account),
		other => Err(ExchangeError::UnknownImplementation(other.to_string())),
	}
}
