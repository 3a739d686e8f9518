//! Intent-level order execution.
//!
//! [`IntentExecutor`] operations never fail: each performs its venue calls,
//! logs what happened and returns an [`ExecutionOutcome`]. A failed order is
//! abandoned, not retried.

use crate::ExchangeInterface;
use async_trait::async_trait;
use relayer_types::{ExchangeResponse, FilledOrder, OrderId, OrderStatus, Position, Side};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What an executor operation achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
	/// The order executed immediately.
	Filled(Vec<FilledOrder>),
	/// Accepted by the venue without an immediate fill.
	Accepted,
	/// The venue reported an error status for the order.
	Rejected(String),
	/// A close left an order resting; a cancel was issued for it.
	RestingCancelled { oid: OrderId, cancelled: bool },
	/// A close returned neither a resting nor a filled order.
	Ambiguous,
	/// The venue refused the request or it never reached the venue.
	Failed(String),
	/// Close of the previous position (when one existed), then the new open.
	Replaced {
		close: Option<Box<ExecutionOutcome>>,
		open: Box<ExecutionOutcome>,
	},
}

impl ExecutionOutcome {
	/// True when this outcome, or a nested close, was ambiguous.
	pub fn is_ambiguous(&self) -> bool {
		match self {
			ExecutionOutcome::Ambiguous => true,
			ExecutionOutcome::Replaced { close, .. } => {
				close.as_ref().map(|c| c.is_ambiguous()).unwrap_or(false)
			}
			_ => false,
		}
	}
}

#[async_trait]
pub trait IntentExecutor: Send + Sync {
	/// Opens a market position in the direction of `side`.
	async fn open(&self, coin: &str, side: Side, size: Decimal, min_price: Decimal)
		-> ExecutionOutcome;

	/// Closes the current position in `coin`.
	async fn close(&self, coin: &str) -> ExecutionOutcome;

	/// Open position in `coin`, `None` when flat.
	async fn position(&self, coin: &str) -> Result<Option<Position>, String>;

	/// Cancels the intent's exposure; identical to [`close`](Self::close).
	async fn cancel(&self, coin: &str) -> ExecutionOutcome {
		self.close(coin).await
	}

	/// Closes any open position in `coin`, then opens the new parameters.
	///
	/// When the position cannot be looked up the update is abandoned before
	/// either order is sent.
	async fn replace(
		&self,
		coin: &str,
		side: Side,
		size: Decimal,
		min_price: Decimal,
	) -> ExecutionOutcome {
		let close = match self.position(coin).await {
			Ok(Some(position)) => {
				info!(coin = %coin, size = %position.size, "Closing existing position before update");
				Some(Box::new(self.close(coin).await))
			}
			Ok(None) => None,
			Err(message) => {
				error!(coin = %coin, error = %message, "Abandoning update, position unknown");
				return ExecutionOutcome::Failed(message);
			}
		};

		let open = self.open(coin, side, size, min_price).await;
		ExecutionOutcome::Replaced {
			close,
			open: Box::new(open),
		}
	}
}

/// Executes intents as market orders on an [`ExchangeInterface`].
pub struct OrderExecutor {
	exchange: Arc<dyn ExchangeInterface>,
	slippage: Decimal,
}

impl OrderExecutor {
	pub fn new(exchange: Arc<dyn ExchangeInterface>, slippage: Decimal) -> Self {
		Self { exchange, slippage }
	}

	async fn cancel_resting(&self, coin: &str, oid: OrderId) -> bool {
		match self.exchange.cancel(coin, oid).await {
			Ok(ExchangeResponse::Ok(statuses)) => {
				let failure = statuses.iter().find_map(|status| match status {
					OrderStatus::Error(message) => Some(message.clone()),
					_ => None,
				});
				match failure {
					Some(message) => {
						warn!(coin = %coin, oid, error = %message, "Cancel of resting order rejected");
						false
					}
					None => {
						info!(coin = %coin, oid, "Cancelled resting order");
						true
					}
				}
			}
			Ok(ExchangeResponse::Err(message)) => {
				error!(coin = %coin, oid, error = %message, "Cancel failed");
				false
			}
			Err(e) => {
				error!(coin = %coin, oid, error = %e, "Cancel failed");
				false
			}
		}
	}
}

#[async_trait]
impl IntentExecutor for OrderExecutor {
	async fn open(
		&self,
		coin: &str,
		side: Side,
		size: Decimal,
		min_price: Decimal,
	) -> ExecutionOutcome {
		info!(
			coin = %coin,
			side = %side,
			size = %size,
			min_price = %min_price,
			"Executing market order"
		);

		let response = match self
			.exchange
			.market_open(coin, side.is_buy(), size, None, self.slippage)
			.await
		{
			Ok(response) => response,
			Err(e) => {
				error!(coin = %coin, error = %e, "Market order failed");
				return ExecutionOutcome::Failed(e.to_string());
			}
		};

		let statuses = match response {
			ExchangeResponse::Ok(statuses) => statuses,
			ExchangeResponse::Err(message) => {
				error!(coin = %coin, error = %message, "Market order rejected");
				return ExecutionOutcome::Failed(message);
			}
		};

		let mut fills = Vec::new();
		let mut rejection = None;
		for status in statuses {
			match status {
				OrderStatus::Filled(fill) => {
					info!(
						coin = %coin,
						oid = fill.oid,
						total_sz = %fill.total_sz,
						avg_px = %fill.avg_px,
						"Order filled"
					);
					fills.push(fill);
				}
				OrderStatus::Error(message) => {
					warn!(coin = %coin, error = %message, "Order error");
					rejection.get_or_insert(message);
				}
				OrderStatus::Resting { oid } => {
					info!(coin = %coin, oid, "Order resting");
				}
				OrderStatus::Success => {}
			}
		}

		match (fills.is_empty(), rejection) {
			(false, _) => ExecutionOutcome::Filled(fills),
			(true, Some(message)) => ExecutionOutcome::Rejected(message),
			(true, None) => ExecutionOutcome::Accepted,
		}
	}

	async fn close(&self, coin: &str) -> ExecutionOutcome {
		info!(coin = %coin, "Closing position");

		let response = match self.exchange.market_close(coin, self.slippage).await {
			Ok(response) => response,
			Err(e) => {
				error!(coin = %coin, error = %e, "Close failed");
				return ExecutionOutcome::Failed(e.to_string());
			}
		};

		let statuses = match response {
			ExchangeResponse::Ok(statuses) => statuses,
			ExchangeResponse::Err(message) => {
				error!(coin = %coin, error = %message, "Close rejected");
				return ExecutionOutcome::Failed(message);
			}
		};

		match statuses.into_iter().next() {
			Some(OrderStatus::Resting { oid }) => {
				info!(coin = %coin, oid, "Close order resting, cancelling it");
				let cancelled = self.cancel_resting(coin, oid).await;
				ExecutionOutcome::RestingCancelled { oid, cancelled }
			}
			Some(OrderStatus::Filled(fill)) => {
				info!(
					coin = %coin,
					oid = fill.oid,
					total_sz = %fill.total_sz,
					avg_px = %fill.avg_px,
					"Position closed"
				);
				ExecutionOutcome::Filled(vec![fill])
			}
			other => {
				warn!(coin = %coin, status = ?other, "No resting or filled order in close response");
				ExecutionOutcome::Ambiguous
			}
		}
	}

	async fn position(&self, coin: &str) -> Result<Option<Position>, String> {
		self.exchange.open_position(coin).await.map_err(|e| {
			error!(coin = %coin, error = %e, "Position lookup failed");
			e.to_string()
		})
	}
}
