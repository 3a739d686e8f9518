//! Hyperliquid perpetuals backend.
//!
//! Reads go to `POST /info`, signed order and cancel actions to
//! `POST /exchange`. Market orders are immediate-or-cancel limit orders priced
//! off the mid with a slippage allowance, as the venue has no native market
//! order type.

pub mod signing;
pub mod wire;

use crate::{ExchangeError, ExchangeInterface};
use alloy_primitives::Address;
use async_trait::async_trait;
use relayer_account::AccountInterface;
use relayer_types::{
	AccountSummary, ConfigSchema, ExchangeResponse, Field, FieldType, OpenOrder, OrderId,
	Position, Schema, ValidationError,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use wire::{
	parse_decimal, to_wire, Action, BulkCancel, BulkOrder, CancelWire, ClearinghouseState,
	ExchangePayload, ExchangeResponseWire, InfoRequest, Meta, OpenOrderWire, OrderTypeWire,
	OrderWire,
};

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Significant figures allowed in a perp price.
const PRICE_SIG_FIGS: u32 = 5;
/// Maximum decimals of a perp price before subtracting the asset's size decimals.
const MAX_PRICE_DECIMALS: u32 = 6;

/// Rounds `reference` moved by `slippage` to a price the venue accepts.
pub fn slippage_price(reference: Decimal, is_buy: bool, slippage: Decimal, sz_decimals: u32) -> Decimal {
	let px = if is_buy {
		reference * (Decimal::ONE + slippage)
	} else {
		reference * (Decimal::ONE - slippage)
	};
	let px = px.round_sf(PRICE_SIG_FIGS).unwrap_or(px);
	px.round_dp(MAX_PRICE_DECIMALS.saturating_sub(sz_decimals))
}

pub struct HyperliquidExchange {
	client: reqwest::Client,
	base_url: String,
	mainnet: bool,
	account: Arc<dyn AccountInterface>,
	/// Account whose positions and orders are queried.
	user: Address,
	meta: OnceCell<Meta>,
	last_nonce: AtomicU64,
}

impl HyperliquidExchange {
	pub fn new(
		base_url: &str,
		mainnet: bool,
		account: Arc<dyn AccountInterface>,
		user: Option<Address>,
	) -> Self {
		let user = user.unwrap_or_else(|| account.address());
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			mainnet,
			account,
			user,
			meta: OnceCell::new(),
			last_nonce: AtomicU64::new(0),
		}
	}

	async fn post<B: Serialize, T: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
	) -> Result<T, ExchangeError> {
		let url = format!("{}/{}", self.base_url, path);
		let response = self
			.client
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| ExchangeError::Network(format!("POST {} failed: {}", url, e)))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ExchangeError::Network(format!(
				"POST {} returned {}: {}",
				url, status, body
			)));
		}

		response
			.json::<T>()
			.await
			.map_err(|e| ExchangeError::InvalidResponse(format!("{}: {}", path, e)))
	}

	async fn info<T: DeserializeOwned>(&self, request: &InfoRequest) -> Result<T, ExchangeError> {
		self.post("info", request).await
	}

	async fn meta(&self) -> Result<&Meta, ExchangeError> {
		self.meta
			.get_or_try_init(|| async { self.info(&InfoRequest::Meta).await })
			.await
	}

	/// Asset index and size decimals of `coin`.
	async fn asset(&self, coin: &str) -> Result<(u32, u32), ExchangeError> {
		let meta = self.meta().await?;
		meta.universe
			.iter()
			.position(|asset| asset.name == coin)
			.map(|index| (index as u32, meta.universe[index].sz_decimals))
			.ok_or_else(|| ExchangeError::UnknownAsset(coin.to_string()))
	}

	async fn mid_price(&self, coin: &str) -> Result<Decimal, ExchangeError> {
		let mids: HashMap<String, String> = self.info(&InfoRequest::AllMids).await?;
		let mid = mids
			.get(coin)
			.ok_or_else(|| ExchangeError::UnknownAsset(format!("no mid price for {}", coin)))?;
		parse_decimal("mid", mid).map_err(ExchangeError::InvalidResponse)
	}

	async fn clearinghouse_state(&self) -> Result<ClearinghouseState, ExchangeError> {
		self.info(&InfoRequest::ClearinghouseState {
			user: self.user.to_string(),
		})
		.await
	}

	/// Millisecond timestamp, strictly increasing across calls.
	fn next_nonce(&self) -> u64 {
		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis() as u64)
			.unwrap_or(0);

		let mut last = self.last_nonce.load(Ordering::SeqCst);
		loop {
			let next = now.max(last + 1);
			match self
				.last_nonce
				.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
			{
				Ok(_) => return next,
				Err(current) => last = current,
			}
		}
	}

	async fn submit(&self, action: Action) -> Result<ExchangeResponse, ExchangeError> {
		let nonce = self.next_nonce();
		let signature =
			signing::sign_l1_action(self.account.as_ref(), &action, nonce, self.mainnet).await?;

		let payload = ExchangePayload {
			action,
			nonce,
			signature,
			vault_address: None,
		};

		let wire: ExchangeResponseWire = self.post("exchange", &payload).await?;
		ExchangeResponse::try_from(wire).map_err(ExchangeError::InvalidResponse)
	}

	async fn ioc_order(
		&self,
		coin: &str,
		is_buy: bool,
		size: Decimal,
		reference_px: Decimal,
		slippage: Decimal,
		reduce_only: bool,
	) -> Result<ExchangeResponse, ExchangeError> {
		let (asset, sz_decimals) = self.asset(coin).await?;

		let sz = size.round_dp(sz_decimals);
		if sz.is_zero() {
			return Err(ExchangeError::InvalidOrder(format!(
				"size {} rounds to zero at {} decimals",
				size, sz_decimals
			)));
		}
		let px = slippage_price(reference_px, is_buy, slippage, sz_decimals);

		info!(
			coin = %coin,
			is_buy,
			sz = %sz,
			px = %px,
			reduce_only,
			"Submitting IOC order"
		);

		self.submit(Action::Order(BulkOrder {
			orders: vec![OrderWire {
				asset,
				is_buy,
				limit_px: to_wire(px),
				sz: to_wire(sz),
				reduce_only,
				order_type: OrderTypeWire::ioc(),
			}],
			grouping: "na".to_string(),
		}))
		.await
	}
}

fn optional_decimal(field: &str, value: Option<&String>) -> Result<Option<Decimal>, ExchangeError> {
	value
		.map(|v| parse_decimal(field, v))
		.transpose()
		.map_err(ExchangeError::InvalidResponse)
}

fn positions(state: &ClearinghouseState) -> Result<Vec<Position>, ExchangeError> {
	let mut positions = Vec::new();
	for asset in &state.asset_positions {
		let wire = &asset.position;
		let size = parse_decimal("szi", &wire.szi).map_err(ExchangeError::InvalidResponse)?;
		if size.is_zero() {
			continue;
		}
		positions.push(Position {
			coin: wire.coin.clone(),
			size,
			entry_px: optional_decimal("entryPx", wire.entry_px.as_ref())?,
			unrealized_pnl: optional_decimal("unrealizedPnl", wire.unrealized_pnl.as_ref())?,
		});
	}
	Ok(positions)
}

#[async_trait]
impl ExchangeInterface for HyperliquidExchange {
	async fn market_open(
		&self,
		coin: &str,
		is_buy: bool,
		size: Decimal,
		px_hint: Option<Decimal>,
		slippage: Decimal,
	) -> Result<ExchangeResponse, ExchangeError> {
		let reference_px = match px_hint {
			Some(px) => px,
			None => self.mid_price(coin).await?,
		};
		self.ioc_order(coin, is_buy, size, reference_px, slippage, false)
			.await
	}

	async fn market_close(
		&self,
		coin: &str,
		slippage: Decimal,
	) -> Result<ExchangeResponse, ExchangeError> {
		let state = self.clearinghouse_state().await?;
		let position = match positions(&state)?.into_iter().find(|p| p.coin == coin) {
			Some(position) => position,
			None => {
				debug!(coin = %coin, "No position to close");
				return Ok(ExchangeResponse::Err(format!("no open position for {}", coin)));
			}
		};

		let is_buy = position.size.is_sign_negative();
		let reference_px = self.mid_price(coin).await?;
		self.ioc_order(coin, is_buy, position.size.abs(), reference_px, slippage, true)
			.await
	}

	async fn cancel(&self, coin: &str, oid: OrderId) -> Result<ExchangeResponse, ExchangeError> {
		let (asset, _) = self.asset(coin).await?;
		info!(coin = %coin, oid, "Cancelling order");

		self.submit(Action::Cancel(BulkCancel {
			cancels: vec![CancelWire { asset, oid }],
		}))
		.await
	}

	async fn open_position(&self, coin: &str) -> Result<Option<Position>, ExchangeError> {
		let state = self.clearinghouse_state().await?;
		Ok(positions(&state)?.into_iter().find(|p| p.coin == coin))
	}

	async fn account_summary(&self) -> Result<AccountSummary, ExchangeError> {
		let state = self.clearinghouse_state().await?;
		let orders: Vec<OpenOrderWire> = self
			.info(&InfoRequest::OpenOrders {
				user: self.user.to_string(),
			})
			.await?;

		let decimal = |field: &str, value: &str| {
			parse_decimal(field, value).map_err(ExchangeError::InvalidResponse)
		};

		let open_orders = orders
			.iter()
			.map(|order| {
				Ok(OpenOrder {
					coin: order.coin.clone(),
					oid: order.oid,
					is_buy: order.side == "B",
					limit_px: decimal("limitPx", &order.limit_px)?,
					sz: decimal("sz", &order.sz)?,
				})
			})
			.collect::<Result<Vec<_>, ExchangeError>>()?;

		Ok(AccountSummary {
			address: self.user.to_string(),
			account_value: decimal("accountValue", &state.margin_summary.account_value)?,
			total_margin_used: decimal("totalMarginUsed", &state.margin_summary.total_margin_used)?,
			withdrawable: decimal("withdrawable", &state.withdrawable)?,
			positions: positions(&state)?,
			open_orders,
		})
	}
}

/// Configuration schema for [`HyperliquidExchange`].
pub struct HyperliquidSchema;

impl ConfigSchema for HyperliquidSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("api_url", FieldType::Url)],
			vec![
				Field::new("mainnet", FieldType::Boolean),
				Field::new("account_address", FieldType::Address),
			],
		)
		.validate(config)
	}
}

/// Builds a [`HyperliquidExchange`].
///
/// `mainnet` defaults to whether `api_url` is the public mainnet endpoint; it
/// selects the phantom agent source used when signing.
pub fn create_exchange(
	config: &toml::Value,
	account: Arc<dyn AccountInterface>,
) -> Result<Box<dyn ExchangeInterface>, ExchangeError> {
	HyperliquidSchema
		.validate(config)
		.map_err(|e| ExchangeError::InvalidConfig(e.to_string()))?;

	let api_url = config
		.get("api_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ExchangeError::InvalidConfig("api_url is required".to_string()))?;

	let mainnet = config
		.get("mainnet")
		.and_then(|v| v.as_bool())
		.unwrap_or_else(|| api_url.trim_end_matches('/') == MAINNET_API_URL);

	let user = config
		.get("account_address")
		.and_then(|v| v.as_str())
		.map(|addr| {
			addr.parse::<Address>()
				.map_err(|e| ExchangeError::InvalidConfig(format!("Invalid account_address: {}", e)))
		})
		.transpose()?;

	Ok(Box::new(HyperliquidExchange::new(
		api_url, mainnet, account, user,
	)))
}
