use anyhow::{Context, Result};
use clap::Parser;
use relayer_account::{create_account, AccountInterface};
use relayer_config::{Config, ConfigLoader};
use relayer_core::RelayerBuilder;
use relayer_discovery::create_ledger;
use relayer_exchange::create_exchange;
use relayer_types::Platform;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod intents;

use cli::{Args, Command, LogFormat};
use intents::{CommandOutcome, IntentClient, IntentRequest};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let config = load_config(&args.config).await?;
	let log_level = args
		.log_level
		.as_deref()
		.unwrap_or(&config.relayer.log_level);
	setup_tracing(log_level, args.log_format)?;

	match args.command.unwrap_or(Command::Run) {
		Command::Run => run_relayer(config).await,
		Command::Validate => validate_config(&config),
		Command::Create {
			coin,
			side,
			size,
			min_price,
		} => {
			let request = IntentRequest {
				platform: Platform::Hyperliquid,
				coin,
				side: side.into(),
				size,
				min_price,
			};
			let outcome = intent_client(&config)?.create(&request).await?;
			report(outcome);
			Ok(())
		}
		Command::Update { size, min_price } => {
			let outcome = intent_client(&config)?.update(size, min_price).await?;
			report(outcome);
			Ok(())
		}
		Command::Delete => {
			let outcome = intent_client(&config)?.delete().await?;
			report(outcome);
			Ok(())
		}
		Command::Check => {
			intent_client(&config)?.check().await?;
			Ok(())
		}
		Command::Summary => account_summary(&config).await,
	}
}

async fn load_config(path: &Path) -> Result<Config> {
	ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn run_relayer(config: Config) -> Result<()> {
	info!(name = %config.relayer.name, "Starting intent relayer");

	let ledger_impl = config.ledger.implementation.clone();
	let account_impl = config.account.implementation.clone();
	let exchange_impl = config.exchange.implementation.clone();

	let engine = RelayerBuilder::new(config)
		.with_ledger_factory(move |cfg| create_ledger(&ledger_impl, cfg))
		.with_account_factory(move |cfg| create_account(&account_impl, cfg))
		.with_exchange_factory(move |cfg, account| create_exchange(&exchange_impl, cfg, account))
		.build()
		.await
		.context("Failed to build relayer")?;

	engine
		.run(shutdown_signal())
		.await
		.context("Relayer stopped with an error")?;

	info!("Intent relayer stopped");
	Ok(())
}

/// Creates every configured backend without touching the network.
fn validate_config(config: &Config) -> Result<()> {
	info!("Relayer name: {}", config.relayer.name);

	create_ledger(&config.ledger.implementation, &config.ledger.config)
		.context("Invalid ledger configuration")?;
	info!("  Ledger: {}", config.ledger.implementation);

	let account = account(config)?;
	info!(
		"  Account: {} ({})",
		config.account.implementation,
		account.address()
	);

	create_exchange(
		&config.exchange.implementation,
		&config.exchange.config,
		account,
	)
	.context("Invalid exchange configuration")?;
	info!("  Exchange: {}", config.exchange.implementation);

	info!("Configuration is valid");
	Ok(())
}

async fn account_summary(config: &Config) -> Result<()> {
	let exchange = create_exchange(
		&config.exchange.implementation,
		&config.exchange.config,
		account(config)?,
	)
	.context("Failed to create exchange client")?;

	let summary = exchange
		.account_summary()
		.await
		.context("Failed to fetch account summary")?;

	info!(
		address = %summary.address,
		account_value = %summary.account_value,
		total_margin_used = %summary.total_margin_used,
		withdrawable = %summary.withdrawable,
		"Account summary"
	);
	for position in &summary.positions {
		info!(
			coin = %position.coin,
			size = %position.size,
			entry_px = ?position.entry_px,
			unrealized_pnl = ?position.unrealized_pnl,
			"Open position"
		);
	}
	for order in &summary.open_orders {
		info!(
			coin = %order.coin,
			oid = order.oid,
			is_buy = order.is_buy,
			limit_px = %order.limit_px,
			sz = %order.sz,
			"Open order"
		);
	}

	Ok(())
}

fn account(config: &Config) -> Result<Arc<dyn AccountInterface>> {
	let account = create_account(&config.account.implementation, &config.account.config)
		.context("Invalid account configuration")?;
	Ok(Arc::from(account))
}

fn intent_client(config: &Config) -> Result<IntentClient> {
	let account = account(config)?;
	IntentClient::connect(config, account.as_ref())
}

fn report(outcome: CommandOutcome) {
	match outcome {
		CommandOutcome::Submitted(tx_hash) => info!(tx_hash = %tx_hash, "Intent transaction confirmed"),
		CommandOutcome::Skipped => info!("Nothing submitted"),
	}
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
	let registry = tracing_subscriber::registry().with(env_filter);

	match format {
		LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
		LogFormat::Text => registry.with(fmt::layer()).try_init(),
	}
	.context("Failed to initialise logging")
}

/// Resolves on Ctrl+C or, on unix, SIGTERM. A handler that cannot be
/// installed never resolves.
async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to install Ctrl+C handler: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	info!("Shutdown signal received");
}
