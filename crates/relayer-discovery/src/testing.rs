//! Test support: registry log builders and an in-memory ledger.

use crate::contract::{IntentCancelled, IntentCreated, IntentUpdated};
use crate::{DiscoveryError, LedgerInterface};
use alloy_primitives::{address, Address, FixedBytes, Log as PrimLog, LogData, B256};
use alloy_rpc_types::Log;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use relayer_types::{encode_coin, to_wad, EventKind, Intent, IntentStatus, Platform, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Address the fake registry logs are emitted from.
pub const REGISTRY: Address = address!("4988BCB69356B55b3Eb645Cc27F54A2B625dA43B");

/// Raw event fields, before ABI encoding.
#[derive(Debug, Clone)]
pub struct TestIntent {
	pub user: Address,
	pub platform: u8,
	pub coin: String,
	/// Overrides the padded coin bytes, for undecodable symbols.
	pub coin_raw: Option<B256>,
	pub side: u8,
	pub size: Decimal,
	pub min_price: Decimal,
}

impl TestIntent {
	/// Hyperliquid ETH short of 0.003 with a 2500 floor.
	pub fn eth_short() -> Self {
		Self {
			user: Address::repeat_byte(0x42),
			platform: 0,
			coin: "ETH".to_string(),
			coin_raw: None,
			side: 1,
			size: Decimal::from_str("0.003").expect("valid decimal"),
			min_price: Decimal::from(2500),
		}
	}

	fn coin_bytes(&self) -> FixedBytes<32> {
		self.coin_raw
			.unwrap_or_else(|| encode_coin(&self.coin).expect("coin fits in bytes32"))
	}
}

/// Wraps encoded event data into an RPC log from [`REGISTRY`].
pub fn rpc_log(data: LogData, tx_hash: B256, block_number: u64) -> Log {
	Log {
		inner: PrimLog {
			address: REGISTRY,
			data,
		},
		block_number: Some(block_number),
		transaction_hash: Some(tx_hash),
		log_index: Some(0),
		..Default::default()
	}
}

pub fn created_log(intent: &TestIntent, tx_hash: B256, block_number: u64) -> Log {
	let event = IntentCreated {
		user: intent.user,
		platform: intent.platform,
		coin: intent.coin_bytes(),
		side: intent.side,
		size: to_wad(intent.size).expect("size fits"),
		minPrice: to_wad(intent.min_price).expect("price fits"),
	};
	rpc_log(event.encode_log_data(), tx_hash, block_number)
}

pub fn updated_log(intent: &TestIntent, tx_hash: B256, block_number: u64) -> Log {
	let event = IntentUpdated {
		user: intent.user,
		platform: intent.platform,
		coin: intent.coin_bytes(),
		side: intent.side,
		newSize: to_wad(intent.size).expect("size fits"),
		newMinPrice: to_wad(intent.min_price).expect("price fits"),
	};
	rpc_log(event.encode_log_data(), tx_hash, block_number)
}

pub fn cancelled_log(intent: &TestIntent, tx_hash: B256, block_number: u64) -> Log {
	let event = IntentCancelled {
		user: intent.user,
		platform: intent.platform,
		coin: intent.coin_bytes(),
	};
	rpc_log(event.encode_log_data(), tx_hash, block_number)
}

/// In-memory ledger serving canned logs.
///
/// Records every log query so tests can assert on the scanned ranges, and can
/// be told to fail the next N calls to exercise retries.
#[derive(Default)]
pub struct MockLedger {
	head: AtomicU64,
	logs: Mutex<Vec<(EventKind, Log)>>,
	intents: Mutex<HashMap<Address, Intent>>,
	queries: Mutex<Vec<(EventKind, u64, u64)>>,
	failures: AtomicUsize,
}

impl MockLedger {
	pub fn new(head: u64) -> Self {
		let ledger = Self::default();
		ledger.set_head(head);
		ledger
	}

	pub fn set_head(&self, head: u64) {
		self.head.store(head, Ordering::SeqCst);
	}

	pub fn push_log(&self, kind: EventKind, log: Log) {
		self.logs.lock().expect("lock").push((kind, log));
	}

	pub fn set_intent(&self, user: Address, intent: Intent) {
		self.intents.lock().expect("lock").insert(user, intent);
	}

	/// Makes the next `count` calls fail with an RPC error.
	pub fn fail_next(&self, count: usize) {
		self.failures.store(count, Ordering::SeqCst);
	}

	/// Log queries issued so far as `(kind, from, to)`.
	pub fn queries(&self) -> Vec<(EventKind, u64, u64)> {
		self.queries.lock().expect("lock").clone()
	}

	fn maybe_fail(&self) -> Result<(), DiscoveryError> {
		let remaining = self.failures.load(Ordering::SeqCst);
		if remaining > 0 {
			self.failures.store(remaining - 1, Ordering::SeqCst);
			return Err(DiscoveryError::Rpc("connection refused".to_string()));
		}
		Ok(())
	}
}

#[async_trait]
impl LedgerInterface for MockLedger {
	async fn block_number(&self) -> Result<u64, DiscoveryError> {
		self.maybe_fail()?;
		Ok(self.head.load(Ordering::SeqCst))
	}

	async fn get_logs(
		&self,
		kind: EventKind,
		from_block: u64,
		to_block: u64,
	) -> Result<Vec<Log>, DiscoveryError> {
		self.maybe_fail()?;
		self.queries
			.lock()
			.expect("lock")
			.push((kind, from_block, to_block));

		Ok(self
			.logs
			.lock()
			.expect("lock")
			.iter()
			.filter(|(k, log)| {
				*k == kind
					&& log
						.block_number
						.map(|b| b >= from_block && b <= to_block)
						.unwrap_or(false)
			})
			.map(|(_, log)| log.clone())
			.collect())
	}

	async fn get_intent(&self, user: Address) -> Result<Intent, DiscoveryError> {
		self.maybe_fail()?;
		Ok(self
			.intents
			.lock()
			.expect("lock")
			.get(&user)
			.cloned()
			.unwrap_or(Intent {
				platform: Platform::Hyperliquid,
				coin: String::new(),
				side: Side::Long,
				size: Decimal::ZERO,
				min_price: Decimal::ZERO,
				timestamp: 0,
				status: IntentStatus::None,
			}))
	}
}
