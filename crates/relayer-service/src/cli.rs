//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use relayer_types::Side;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "intent-relayer")]
#[command(about = "Relays on-chain trading intents to Hyperliquid", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, value_name = "FILE", default_value = "config/relayer.toml")]
	pub config: PathBuf,

	/// Log level override (trace, debug, info, warn, error). RUST_LOG takes
	/// precedence; the configured level applies when neither is set.
	#[arg(short, long, env = "RELAYER_LOG_LEVEL")]
	pub log_level: Option<String>,

	/// Log output format
	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	pub log_format: LogFormat,

	/// Subcommand to execute, `run` when omitted
	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	Text,
	Json,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
	/// Scan the intent registry and execute intents until interrupted
	Run,

	/// Validate the configuration file
	Validate,

	/// Register a new intent for the configured account
	Create {
		#[arg(long, default_value = "ETH")]
		coin: String,
		#[arg(long, value_enum, default_value_t = SideArg::Short)]
		side: SideArg,
		#[arg(long, default_value = "0.003")]
		size: Decimal,
		#[arg(long, default_value = "2500")]
		min_price: Decimal,
	},

	/// Change the size (and optionally the price) of the active intent
	Update {
		#[arg(long, default_value = "0.004")]
		size: Decimal,
		/// Defaults to the stored minimum price
		#[arg(long)]
		min_price: Option<Decimal>,
	},

	/// Clear the active intent
	Delete,

	/// Show the intent stored for the configured account
	Check,

	/// Show margin, positions and open orders on the exchange
	Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
	Long,
	Short,
}

impl From<SideArg> for Side {
	fn from(side: SideArg) -> Self {
		match side {
			SideArg::Long => Side::Long,
			SideArg::Short => Side::Short,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::dec;

	#[test]
	fn test_defaults_to_run() {
		let args = Args::try_parse_from(["intent-relayer"]).unwrap();

		assert_eq!(args.command, None);
		assert_eq!(args.config, PathBuf::from("config/relayer.toml"));
		assert_eq!(args.log_format, LogFormat::Text);
	}

	#[test]
	fn test_create_defaults() {
		let args = Args::try_parse_from(["intent-relayer", "create"]).unwrap();

		assert_eq!(
			args.command,
			Some(Command::Create {
				coin: "ETH".to_string(),
				side: SideArg::Short,
				size: dec!(0.003),
				min_price: dec!(2500),
			})
		);
	}

	#[test]
	fn test_update_with_price() {
		let args = Args::try_parse_from([
			"intent-relayer",
			"--log-format",
			"json",
			"update",
			"--size",
			"0.01",
			"--min-price",
			"2600",
		])
		.unwrap();

		assert_eq!(args.log_format, LogFormat::Json);
		assert_eq!(
			args.command,
			Some(Command::Update {
				size: dec!(0.01),
				min_price: Some(dec!(2600)),
			})
		);
	}

	#[test]
	fn test_unknown_command_is_rejected() {
		assert!(Args::try_parse_from(["intent-relayer", "liquidate"]).is_err());
		assert!(Args::try_parse_from(["intent-relayer", "create", "--side", "up"]).is_err());
	}
}
