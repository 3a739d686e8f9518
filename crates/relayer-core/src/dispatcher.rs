//! Routes decoded intent events to executor operations.

use crate::guard::ReplayGuard;
use relayer_exchange::{ExecutionOutcome, IntentExecutor};
use relayer_types::{IntentAction, IntentEvent, Platform};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Venue the relayer executes on. Intents for other platforms are ignored.
pub const SUPPORTED_PLATFORM: Platform = Platform::Hyperliquid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
	/// The transaction already triggered an action.
	Duplicate,
	/// The intent targets a platform this relayer does not trade on.
	Unsupported(Platform),
	Executed(ExecutionOutcome),
}

pub struct IntentDispatcher {
	guard: ReplayGuard,
	executor: Arc<dyn IntentExecutor>,
	ambiguous_closes: u64,
}

impl IntentDispatcher {
	pub fn new(guard: ReplayGuard, executor: Arc<dyn IntentExecutor>) -> Self {
		Self {
			guard,
			executor,
			ambiguous_closes: 0,
		}
	}

	/// Executes `event` unless its transaction was already handled or it
	/// targets another platform.
	pub async fn dispatch(&mut self, event: &IntentEvent) -> DispatchOutcome {
		if !self.guard.should_process(&event.tx_hash) {
			debug!(tx_hash = %event.tx_hash.short(), "Skipping already processed transaction");
			return DispatchOutcome::Duplicate;
		}

		if event.platform != SUPPORTED_PLATFORM {
			debug!(
				tx_hash = %event.tx_hash.short(),
				platform = %event.platform,
				"Skipping intent for unsupported platform"
			);
			return DispatchOutcome::Unsupported(event.platform);
		}

		info!(
			kind = %event.kind(),
			user = %event.user,
			coin = %event.coin,
			tx_hash = %event.tx_hash.short(),
			block = ?event.block_number,
			"Intent {} by {} -> {}",
			event.kind(),
			event.user,
			event.coin
		);

		let outcome = match &event.action {
			IntentAction::Created(params) => {
				self.executor
					.open(&event.coin, params.side, params.size, params.min_price)
					.await
			}
			IntentAction::Updated(params) => {
				self.executor
					.replace(&event.coin, params.side, params.size, params.min_price)
					.await
			}
			IntentAction::Cancelled => self.executor.cancel(&event.coin).await,
		};

		if outcome.is_ambiguous() {
			self.ambiguous_closes += 1;
			warn!(
				tx_hash = %event.tx_hash,
				coin = %event.coin,
				total = self.ambiguous_closes,
				"Close outcome unknown, position may still be open"
			);
		}

		DispatchOutcome::Executed(outcome)
	}

	/// Closes that returned neither a resting nor a filled order.
	pub fn ambiguous_closes(&self) -> u64 {
		self.ambiguous_closes
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use alloy_primitives::{Address, B256};
	use async_trait::async_trait;
	use relayer_types::{OrderParams, Position, Side, TransactionHash};
	use rust_decimal::{dec, Decimal};
	use std::sync::Mutex;
	use std::time::Duration;

	#[derive(Debug, Clone, PartialEq)]
	pub enum ExecCall {
		Open {
			coin: String,
			side: Side,
			size: Decimal,
			min_price: Decimal,
		},
		Replace {
			coin: String,
			side: Side,
			size: Decimal,
			min_price: Decimal,
		},
		Cancel {
			coin: String,
		},
	}

	/// Records every executor call; cancels can be made ambiguous.
	#[derive(Default)]
	pub struct RecordingExecutor {
		pub calls: Mutex<Vec<ExecCall>>,
		pub ambiguous_cancel: bool,
	}

	impl RecordingExecutor {
		pub fn calls(&self) -> Vec<ExecCall> {
			self.calls.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl IntentExecutor for RecordingExecutor {
		async fn open(
			&self,
			coin: &str,
			side: Side,
			size: Decimal,
			min_price: Decimal,
		) -> ExecutionOutcome {
			self.calls.lock().unwrap().push(ExecCall::Open {
				coin: coin.to_string(),
				side,
				size,
				min_price,
			});
			ExecutionOutcome::Accepted
		}

		async fn close(&self, _coin: &str) -> ExecutionOutcome {
			ExecutionOutcome::Accepted
		}

		async fn position(&self, _coin: &str) -> Result<Option<Position>, String> {
			Ok(None)
		}

		async fn cancel(&self, coin: &str) -> ExecutionOutcome {
			self.calls.lock().unwrap().push(ExecCall::Cancel {
				coin: coin.to_string(),
			});
			if self.ambiguous_cancel {
				ExecutionOutcome::Ambiguous
			} else {
				ExecutionOutcome::Accepted
			}
		}

		async fn replace(
			&self,
			coin: &str,
			side: Side,
			size: Decimal,
			min_price: Decimal,
		) -> ExecutionOutcome {
			self.calls.lock().unwrap().push(ExecCall::Replace {
				coin: coin.to_string(),
				side,
				size,
				min_price,
			});
			ExecutionOutcome::Accepted
		}
	}

	pub fn event(tx: u8, platform: Platform, action: IntentAction) -> IntentEvent {
		IntentEvent {
			tx_hash: TransactionHash(B256::repeat_byte(tx)),
			block_number: Some(1),
			log_index: Some(0),
			user: Address::repeat_byte(0x42),
			platform,
			coin: "ETH".to_string(),
			action,
		}
	}

	fn eth_short(size: Decimal) -> OrderParams {
		OrderParams {
			side: Side::Short,
			size,
			min_price: dec!(2500),
		}
	}

	fn dispatcher(executor: &Arc<RecordingExecutor>) -> IntentDispatcher {
		IntentDispatcher::new(
			ReplayGuard::new(100, Duration::from_secs(3600)),
			executor.clone(),
		)
	}

	#[tokio::test]
	async fn test_same_transaction_dispatched_once() {
		let executor = Arc::new(RecordingExecutor::default());
		let mut dispatcher = dispatcher(&executor);
		let created = event(1, Platform::Hyperliquid, IntentAction::Created(eth_short(dec!(0.003))));

		assert!(matches!(
			dispatcher.dispatch(&created).await,
			DispatchOutcome::Executed(_)
		));
		assert_eq!(dispatcher.dispatch(&created).await, DispatchOutcome::Duplicate);
		assert_eq!(executor.calls().len(), 1);
	}

	#[tokio::test]
	async fn test_unsupported_platform_is_ignored() {
		let executor = Arc::new(RecordingExecutor::default());
		let mut dispatcher = dispatcher(&executor);

		for (tx, platform) in [(1, Platform::Drift), (2, Platform::Unknown)] {
			let outcome = dispatcher
				.dispatch(&event(tx, platform, IntentAction::Cancelled))
				.await;
			assert_eq!(outcome, DispatchOutcome::Unsupported(platform));
		}
		assert!(executor.calls().is_empty());
	}

	#[tokio::test]
	async fn test_eth_intent_lifecycle() {
		let executor = Arc::new(RecordingExecutor::default());
		let mut dispatcher = dispatcher(&executor);

		let events = [
			event(1, Platform::Hyperliquid, IntentAction::Created(eth_short(dec!(0.003)))),
			event(2, Platform::Hyperliquid, IntentAction::Updated(eth_short(dec!(0.004)))),
			event(3, Platform::Hyperliquid, IntentAction::Cancelled),
		];
		for event in &events {
			dispatcher.dispatch(event).await;
		}

		assert_eq!(
			executor.calls(),
			vec![
				ExecCall::Open {
					coin: "ETH".to_string(),
					side: Side::Short,
					size: dec!(0.003),
					min_price: dec!(2500),
				},
				ExecCall::Replace {
					coin: "ETH".to_string(),
					side: Side::Short,
					size: dec!(0.004),
					min_price: dec!(2500),
				},
				ExecCall::Cancel {
					coin: "ETH".to_string()
				},
			]
		);
		assert!(!Side::Short.is_buy());
	}

	#[tokio::test]
	async fn test_ambiguous_close_is_recorded() {
		let executor = Arc::new(RecordingExecutor {
			ambiguous_cancel: true,
			..Default::default()
		});
		let mut dispatcher = dispatcher(&executor);

		let outcome = dispatcher
			.dispatch(&event(9, Platform::Hyperliquid, IntentAction::Cancelled))
			.await;

		assert_eq!(outcome, DispatchOutcome::Executed(ExecutionOutcome::Ambiguous));
		assert_eq!(dispatcher.ambiguous_closes(), 1);
	}
}
