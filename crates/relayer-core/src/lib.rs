//! Relayer core: replay guard, dispatcher and the scan loop, plus the
//! builder that wires them to configured backends.

use relayer_account::{AccountError, AccountInterface};
use relayer_config::Config;
use relayer_discovery::{
	BlockScanner, DiscoveryError, LedgerInterface, RetryPolicy, ScannerConfig,
};
use relayer_exchange::{ExchangeError, ExchangeInterface, IntentExecutor, OrderExecutor};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod dispatcher;
pub mod engine;
pub mod guard;

pub use dispatcher::{DispatchOutcome, IntentDispatcher, SUPPORTED_PLATFORM};
pub use engine::{RelayerEngine, ScanReport};
pub use guard::ReplayGuard;

#[derive(Debug, Error)]
pub enum RelayerError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Ledger error: {0}")]
	Discovery(#[from] DiscoveryError),
	#[error("Account error: {0}")]
	Account(#[from] AccountError),
	#[error("Exchange error: {0}")]
	Exchange(#[from] ExchangeError),
}

pub type LedgerFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, DiscoveryError> + Send>;
pub type AccountFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send>;
pub type ExchangeFactory = Box<
	dyn Fn(&toml::Value, Arc<dyn AccountInterface>) -> Result<Box<dyn ExchangeInterface>, ExchangeError>
		+ Send,
>;

/// Assembles a [`RelayerEngine`] from configuration and backend factories.
pub struct RelayerBuilder {
	config: Config,
	ledger_factory: Option<LedgerFactory>,
	account_factory: Option<AccountFactory>,
	exchange_factory: Option<ExchangeFactory>,
}

impl RelayerBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			ledger_factory: None,
			account_factory: None,
			exchange_factory: None,
		}
	}

	pub fn with_ledger_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn LedgerInterface>, DiscoveryError> + Send + 'static,
	{
		self.ledger_factory = Some(Box::new(factory));
		self
	}

	pub fn with_account_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> + Send + 'static,
	{
		self.account_factory = Some(Box::new(factory));
		self
	}

	pub fn with_exchange_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&toml::Value, Arc<dyn AccountInterface>) -> Result<Box<dyn ExchangeInterface>, ExchangeError>
			+ Send
			+ 'static,
	{
		self.exchange_factory = Some(Box::new(factory));
		self
	}

	/// Creates the backends and positions the scanner.
	///
	/// Without a configured start block the watermark is the current chain
	/// head, which requires one ledger call.
	pub async fn build(self) -> Result<RelayerEngine, RelayerError> {
		let ledger_factory = self
			.ledger_factory
			.ok_or_else(|| RelayerError::Config("Ledger factory not provided".into()))?;
		let ledger: Arc<dyn LedgerInterface> =
			Arc::from(ledger_factory(&self.config.ledger.config)?);

		let account_factory = self
			.account_factory
			.ok_or_else(|| RelayerError::Config("Account factory not provided".into()))?;
		let account: Arc<dyn AccountInterface> =
			Arc::from(account_factory(&self.config.account.config)?);

		let exchange_factory = self
			.exchange_factory
			.ok_or_else(|| RelayerError::Config("Exchange factory not provided".into()))?;
		let exchange: Arc<dyn ExchangeInterface> =
			Arc::from(exchange_factory(&self.config.exchange.config, account.clone())?);

		let executor: Arc<dyn IntentExecutor> = Arc::new(OrderExecutor::new(
			exchange,
			self.config.executor.slippage,
		));

		let retry = &self.config.retry;
		let scanner_config = ScannerConfig {
			max_block_range: self.config.relayer.max_block_range,
			retry: RetryPolicy {
				initial_interval: Duration::from_millis(retry.initial_interval_ms),
				max_interval: Duration::from_millis(retry.max_interval_ms),
				max_elapsed: Duration::from_secs(retry.max_elapsed_secs),
			},
		};
		let scanner =
			BlockScanner::start(ledger, self.config.relayer.start_block, scanner_config).await?;

		let guard = ReplayGuard::new(
			self.config.replay_guard.capacity,
			self.config.replay_guard.ttl(),
		);

		info!(
			name = %self.config.relayer.name,
			account = %account.address(),
			last_block = scanner.last_block(),
			"Relayer initialised"
		);

		Ok(RelayerEngine::new(
			scanner,
			IntentDispatcher::new(guard, executor),
			self.config.relayer.poll_interval(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use relayer_account::implementations::local::LocalWallet;
	use relayer_config::ConfigLoader;
	use relayer_discovery::testing::MockLedger;
	use relayer_types::{AccountSummary, ExchangeResponse, OrderId, Position};
	use rust_decimal::Decimal;

	const CONFIG: &str = r#"
[relayer]
start_block = 42

[ledger]
implementation = "mock"
[ledger.config]
rpc_url = "http://localhost:8545"
contract_address = "0x4988BCB69356B55b3Eb645Cc27F54A2B625dA43B"

[account]
implementation = "local"
[account.config]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[exchange]
implementation = "mock"
[exchange.config]
api_url = "http://localhost:9999"
"#;

	struct NullExchange;

	#[async_trait]
	impl ExchangeInterface for NullExchange {
		async fn market_open(
			&self,
			_coin: &str,
			_is_buy: bool,
			_size: Decimal,
			_px_hint: Option<Decimal>,
			_slippage: Decimal,
		) -> Result<ExchangeResponse, ExchangeError> {
			Ok(ExchangeResponse::Ok(vec![]))
		}

		async fn market_close(
			&self,
			_coin: &str,
			_slippage: Decimal,
		) -> Result<ExchangeResponse, ExchangeError> {
			Ok(ExchangeResponse::Ok(vec![]))
		}

		async fn cancel(&self, _coin: &str, _oid: OrderId) -> Result<ExchangeResponse, ExchangeError> {
			Ok(ExchangeResponse::Ok(vec![]))
		}

		async fn open_position(&self, _coin: &str) -> Result<Option<Position>, ExchangeError> {
			Ok(None)
		}

		async fn account_summary(&self) -> Result<AccountSummary, ExchangeError> {
			Err(ExchangeError::Network("unused".to_string()))
		}
	}

	fn config() -> Config {
		ConfigLoader::new()
			.with_env_prefix("RELAYER_CORE_TEST_")
			.load_from_str(CONFIG)
			.unwrap()
	}

	#[tokio::test]
	async fn test_build_positions_scanner_before_start_block() {
		let engine = RelayerBuilder::new(config())
			.with_ledger_factory(|_| Ok(Box::new(MockLedger::new(500))))
			.with_account_factory(|cfg| {
				let key = cfg.get("private_key").and_then(|v| v.as_str()).unwrap_or_default();
				Ok(Box::new(LocalWallet::new(key)?))
			})
			.with_exchange_factory(|_, _| Ok(Box::new(NullExchange)))
			.build()
			.await
			.unwrap();

		assert_eq!(engine.last_block(), 41);
	}

	#[tokio::test]
	async fn test_build_requires_factories() {
		let result = RelayerBuilder::new(config())
			.with_ledger_factory(|_| Ok(Box::new(MockLedger::new(500))))
			.build()
			.await;

		assert!(matches!(result, Err(RelayerError::Config(msg)) if msg.contains("Account")));
	}
}
