//! Companion commands that manage the configured account's intent on chain.
//!
//! Each command reads the stored intent first and only submits a transaction
//! when the contract's one-intent-per-address rule allows it.

use alloy_network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use alloy_sol_types::SolCall;
use alloy_transport_http::Http;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use relayer_account::AccountInterface;
use relayer_config::Config;
use relayer_discovery::contract::{clearIntentCall, createIntentCall};
use relayer_discovery::LedgerInterface;
use relayer_types::{encode_coin, to_wad, Intent, Platform, Side};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Gas limit attached to intent transactions.
const GAS_LIMIT: u64 = 300_000;

/// Submits signed calls to the intent registry.
#[async_trait]
pub trait IntentWriter: Send + Sync {
	/// Sends `input` to the registry and waits for a successful receipt.
	async fn send(&self, call: &'static str, input: Bytes) -> Result<B256>;
}

/// Writer backed by an Alloy provider that signs with the relayer wallet.
pub struct AlloyIntentWriter {
	provider: Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>,
	contract: Address,
}

impl AlloyIntentWriter {
	pub fn new(rpc_url: &str, contract: Address, wallet: EthereumWallet) -> Result<Self> {
		let url: reqwest::Url = rpc_url
			.parse()
			.with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

		let provider = ProviderBuilder::new()
			.with_recommended_fillers()
			.wallet(wallet)
			.on_http(url);

		Ok(Self {
			provider: Arc::new(provider),
			contract,
		})
	}
}

#[async_trait]
impl IntentWriter for AlloyIntentWriter {
	async fn send(&self, call: &'static str, input: Bytes) -> Result<B256> {
		let request = TransactionRequest::default()
			.to(self.contract)
			.input(TransactionInput::new(input))
			.with_gas_limit(GAS_LIMIT);

		let pending = self
			.provider
			.send_transaction(request)
			.await
			.with_context(|| format!("Failed to send {}", call))?;
		let tx_hash = *pending.tx_hash();
		info!(tx_hash = %tx_hash, call, "Submitted transaction");

		let receipt = pending
			.get_receipt()
			.await
			.with_context(|| format!("Failed to get receipt for {}", tx_hash))?;
		if !receipt.status() {
			bail!("{} reverted in transaction {}", call, tx_hash);
		}

		info!(tx_hash = %tx_hash, block = ?receipt.block_number, "Transaction confirmed");
		Ok(tx_hash)
	}
}

/// Parameters for a new intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
	pub platform: Platform,
	pub coin: String,
	pub side: Side,
	pub size: Decimal,
	pub min_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
	Submitted(B256),
	/// The stored intent's status did not allow the command.
	Skipped,
}

pub struct IntentClient {
	ledger: Box<dyn LedgerInterface>,
	writer: Box<dyn IntentWriter>,
	user: Address,
}

impl IntentClient {
	pub fn new(ledger: Box<dyn LedgerInterface>, writer: Box<dyn IntentWriter>, user: Address) -> Self {
		Self {
			ledger,
			writer,
			user,
		}
	}

	/// Connects to the ledger named in `config`, signing with `account`.
	pub fn connect(config: &Config, account: &dyn AccountInterface) -> Result<Self> {
		let ledger =
			relayer_discovery::create_ledger(&config.ledger.implementation, &config.ledger.config)
				.context("Failed to create ledger client")?;

		let setting = |name: &str| {
			config
				.ledger
				.config
				.get(name)
				.and_then(|v| v.as_str())
				.with_context(|| format!("ledger.config.{} is required", name))
		};
		let contract = setting("contract_address")?
			.parse::<Address>()
			.context("Invalid contract address")?;
		let writer = AlloyIntentWriter::new(setting("rpc_url")?, contract, account.wallet())?;

		Ok(Self::new(ledger, Box::new(writer), account.address()))
	}

	pub async fn check(&self) -> Result<Intent> {
		let intent = self
			.ledger
			.get_intent(self.user)
			.await
			.context("Failed to read intent")?;

		info!(
			user = %self.user,
			platform = %intent.platform,
			coin = %intent.coin,
			side = %intent.side,
			size = %intent.size,
			min_price = %intent.min_price,
			timestamp = intent.timestamp,
			status = %intent.status,
			"Stored intent"
		);
		Ok(intent)
	}

	pub async fn create(&self, request: &IntentRequest) -> Result<CommandOutcome> {
		let current = self.check().await?;
		if current.status.is_active() {
			warn!(user = %self.user, coin = %current.coin, "Intent already active, update or delete it first");
			return Ok(CommandOutcome::Skipped);
		}

		self.submit_intent(request).await
	}

	/// Rewrites the active intent with a new size, keeping its coin and side.
	pub async fn update(&self, size: Decimal, min_price: Option<Decimal>) -> Result<CommandOutcome> {
		let current = self.check().await?;
		if !current.status.is_active() {
			warn!(user = %self.user, "No active intent to update");
			return Ok(CommandOutcome::Skipped);
		}

		let request = IntentRequest {
			platform: current.platform,
			coin: current.coin,
			side: current.side,
			size,
			min_price: min_price.unwrap_or(current.min_price),
		};
		self.submit_intent(&request).await
	}

	pub async fn delete(&self) -> Result<CommandOutcome> {
		let current = self.check().await?;
		if !current.status.is_active() {
			warn!(user = %self.user, "No active intent to delete");
			return Ok(CommandOutcome::Skipped);
		}

		let tx_hash = self
			.writer
			.send("clearIntent", clearIntentCall {}.abi_encode().into())
			.await?;
		Ok(CommandOutcome::Submitted(tx_hash))
	}

	async fn submit_intent(&self, request: &IntentRequest) -> Result<CommandOutcome> {
		let call = createIntentCall {
			platform: request.platform.as_raw(),
			coin: encode_coin(&request.coin)?,
			side: request.side.as_raw(),
			size: to_wad(request.size)?,
			minPrice: to_wad(request.min_price)?,
		};

		info!(
			coin = %request.coin,
			side = %request.side,
			size = %request.size,
			min_price = %request.min_price,
			"Submitting intent"
		);
		let tx_hash = self.writer.send("createIntent", call.abi_encode().into()).await?;
		Ok(CommandOutcome::Submitted(tx_hash))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relayer_discovery::testing::MockLedger;
	use relayer_types::IntentStatus;
	use rust_decimal::dec;
	use std::sync::Mutex;

	const USER: Address = Address::new([0x42; 20]);

	#[derive(Default, Clone)]
	struct RecordingWriter {
		sent: Arc<Mutex<Vec<(&'static str, Bytes)>>>,
	}

	#[async_trait]
	impl IntentWriter for RecordingWriter {
		async fn send(&self, call: &'static str, input: Bytes) -> Result<B256> {
			self.sent.lock().unwrap().push((call, input));
			Ok(B256::repeat_byte(0xaa))
		}
	}

	fn active_intent() -> Intent {
		Intent {
			platform: Platform::Hyperliquid,
			coin: "ETH".to_string(),
			side: Side::Short,
			size: dec!(0.003),
			min_price: dec!(2500),
			timestamp: 1_700_000_000,
			status: IntentStatus::Active,
		}
	}

	fn client(intent: Option<Intent>) -> (IntentClient, RecordingWriter) {
		let ledger = MockLedger::new(1);
		if let Some(intent) = intent {
			ledger.set_intent(USER, intent);
		}
		let writer = RecordingWriter::default();
		let client = IntentClient::new(Box::new(ledger), Box::new(writer.clone()), USER);
		(client, writer)
	}

	fn eth_short() -> IntentRequest {
		IntentRequest {
			platform: Platform::Hyperliquid,
			coin: "ETH".to_string(),
			side: Side::Short,
			size: dec!(0.003),
			min_price: dec!(2500),
		}
	}

	#[tokio::test]
	async fn test_create_encodes_intent() {
		let (client, writer) = client(None);

		let outcome = client.create(&eth_short()).await.unwrap();

		assert_eq!(outcome, CommandOutcome::Submitted(B256::repeat_byte(0xaa)));
		let sent = writer.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].0, "createIntent");

		let call = createIntentCall::abi_decode(&sent[0].1, true).unwrap();
		assert_eq!(call.platform, 0);
		assert_eq!(call.coin, encode_coin("ETH").unwrap());
		assert_eq!(call.side, 1);
		assert_eq!(call.size, to_wad(dec!(0.003)).unwrap());
		assert_eq!(call.minPrice, to_wad(dec!(2500)).unwrap());
	}

	#[tokio::test]
	async fn test_create_skipped_when_active() {
		let (client, writer) = client(Some(active_intent()));

		assert_eq!(client.create(&eth_short()).await.unwrap(), CommandOutcome::Skipped);
		assert!(writer.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_update_keeps_stored_fields() {
		let (client, writer) = client(Some(active_intent()));

		client.update(dec!(0.004), None).await.unwrap();

		let sent = writer.sent.lock().unwrap();
		let call = createIntentCall::abi_decode(&sent[0].1, true).unwrap();
		assert_eq!(call.coin, encode_coin("ETH").unwrap());
		assert_eq!(call.side, Side::Short.as_raw());
		assert_eq!(call.size, to_wad(dec!(0.004)).unwrap());
		assert_eq!(call.minPrice, to_wad(dec!(2500)).unwrap());
	}

	#[tokio::test]
	async fn test_update_and_delete_require_active_intent() {
		let (client, writer) = client(None);

		assert_eq!(client.update(dec!(0.004), None).await.unwrap(), CommandOutcome::Skipped);
		assert_eq!(client.delete().await.unwrap(), CommandOutcome::Skipped);
		assert!(writer.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_delete_clears_active_intent() {
		let (client, writer) = client(Some(active_intent()));

		client.delete().await.unwrap();

		let sent = writer.sent.lock().unwrap();
		assert_eq!(sent[0].0, "clearIntent");
		assert_eq!(&sent[0].1[..], &clearIntentCall::SELECTOR[..]);
	}

	#[tokio::test]
	async fn test_check_surfaces_ledger_errors() {
		let ledger = MockLedger::new(1);
		ledger.fail_next(1);
		let client = IntentClient::new(Box::new(ledger), Box::new(RecordingWriter::default()), USER);

		assert!(client.check().await.is_err());
	}
}
