//! Configuration loading for the relayer.
//!
//! Configuration is read from a TOML file. `${VAR}` placeholders are replaced
//! with environment variables before parsing, a few `RELAYER_*` variables
//! override individual settings afterwards, and the result is validated. A
//! missing RPC endpoint, signing key or contract address stops start-up.

use regex::Regex;
use relayer_types::{Field, FieldType, Schema, ValidationError};
use rust_decimal::Decimal;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

impl From<ValidationError> for ConfigError {
	fn from(err: ValidationError) -> Self {
		ConfigError::ValidationError(err.to_string())
	}
}

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "RELAYER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		let content = match tokio::fs::read_to_string(file_path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(file_path.clone()))
			}
			Err(e) => return Err(e.into()),
		};

		debug!(path = %file_path, "Read configuration file");
		self.load_from_str(&content)
	}

	/// Parses, overrides and validates configuration held in memory.
	pub fn load_from_str(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;

		let mut config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.relayer.log_level = log_level;
		}

		if let Ok(interval) = env::var(format!("{}POLL_INTERVAL_SECS", self.env_prefix)) {
			config.relayer.poll_interval_secs = interval.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid poll interval: {}", e))
			})?;
		}

		if let Ok(start_block) = env::var(format!("{}START_BLOCK", self.env_prefix)) {
			config.relayer.start_block = Some(start_block.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid start block: {}", e))
			})?);
		}

		Ok(())
	}
}

/// Replaces every `${VAR_NAME}` with the value of the environment variable.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

/// Fields without which the relayer cannot start, whatever the backends.
fn required_settings_schema() -> Schema {
	Schema::new(
		vec![
			Field::new(
				"ledger",
				FieldType::Table(Schema::new(
					vec![Field::new(
						"config",
						FieldType::Table(Schema::new(
							vec![
								Field::new("rpc_url", FieldType::Url),
								Field::new("contract_address", FieldType::Address),
							],
							vec![],
						)),
					)],
					vec![],
				)),
			),
			Field::new(
				"account",
				FieldType::Table(Schema::new(
					vec![Field::new(
						"config",
						FieldType::Table(Schema::new(
							vec![Field::new("private_key", FieldType::PrivateKey)],
							vec![],
						)),
					)],
					vec![],
				)),
			),
		],
		vec![],
	)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let mut root = toml::value::Table::new();
	for (name, backend) in [("ledger", &config.ledger), ("account", &config.account)] {
		let mut table = toml::value::Table::new();
		table.insert("config".to_string(), backend.config.clone());
		root.insert(name.to_string(), toml::Value::Table(table));
	}
	required_settings_schema().validate(&toml::Value::Table(root))?;

	if config.relayer.poll_interval_secs == 0 {
		return Err(ConfigError::ValidationError(
			"relayer.poll_interval_secs must be at least 1".to_string(),
		));
	}

	if config.relayer.max_block_range == Some(0) {
		return Err(ConfigError::ValidationError(
			"relayer.max_block_range must be at least 1".to_string(),
		));
	}

	let slippage = config.executor.slippage;
	if slippage <= Decimal::ZERO || slippage >= Decimal::ONE {
		return Err(ConfigError::ValidationError(
			"executor.slippage must be between 0 and 1".to_string(),
		));
	}

	if config.replay_guard.capacity == 0 {
		return Err(ConfigError::ValidationError(
			"replay_guard.capacity must be at least 1".to_string(),
		));
	}

	if config.replay_guard.ttl_secs == 0 {
		return Err(ConfigError::ValidationError(
			"replay_guard.ttl_secs must be at least 1".to_string(),
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	fn sample(private_key: &str) -> String {
		format!(
			r#"
[relayer]
poll_interval_secs = 5

[ledger]
implementation = "alloy"
[ledger.config]
rpc_url = "http://localhost:8545"
contract_address = "0x4988BCB69356B55b3Eb645Cc27F54A2B625dA43B"

[account]
implementation = "local"
[account.config]
private_key = "{}"

[exchange]
implementation = "hyperliquid"
[exchange.config]
api_url = "https://api.hyperliquid-testnet.xyz"
"#,
			private_key
		)
	}

	#[test]
	fn test_load_with_defaults() {
		let config = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_DEFAULTS_")
			.load_from_str(&sample(KEY))
			.unwrap();

		assert_eq!(config.relayer.poll_interval_secs, 5);
		assert_eq!(config.relayer.start_block, None);
		assert_eq!(config.ledger.implementation, "alloy");
		assert_eq!(config.replay_guard.capacity, 100_000);
		assert_eq!(config.retry.max_elapsed_secs, 120);
		assert_eq!(config.executor.slippage, Decimal::new(1, 2));
	}

	#[test]
	fn test_rejects_out_of_range_slippage() {
		let content = format!("{}\n[executor]\nslippage = 1.5\n", sample(KEY));
		let result = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_SLIPPAGE_")
			.load_from_str(&content);

		assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("slippage")));
	}

	#[test]
	fn test_slippage_parsed_exactly() {
		let content = format!("{}\n[executor]\nslippage = 0.003\n", sample(KEY));
		let config = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_SLIPPAGE_EXACT_")
			.load_from_str(&content)
			.unwrap();

		assert_eq!(config.executor.slippage, Decimal::new(3, 3));
	}

	#[test]
	fn test_rejects_zero_guard_ttl() {
		let content = format!("{}\n[replay_guard]\nttl_secs = 0\n", sample(KEY));
		let result = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_TTL_")
			.load_from_str(&content);

		assert!(matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("ttl_secs")));
	}

	#[test]
	fn test_env_substitution() {
		env::set_var("RELAYER_TEST_SUBST_KEY", KEY);
		let config = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_SUBST_")
			.load_from_str(&sample("${RELAYER_TEST_SUBST_KEY}"))
			.unwrap();

		assert_eq!(
			config.account.config.get("private_key").and_then(|v| v.as_str()),
			Some(KEY)
		);
	}

	#[test]
	fn test_missing_env_var_is_fatal() {
		let result = ConfigLoader::new().load_from_str(&sample("${RELAYER_TEST_UNSET_VARIABLE}"));
		assert!(matches!(result, Err(ConfigError::EnvVarNotFound(name)) if name == "RELAYER_TEST_UNSET_VARIABLE"));
	}

	#[test]
	fn test_missing_contract_address_is_fatal() {
		let content = sample(KEY).replace(
			"contract_address = \"0x4988BCB69356B55b3Eb645Cc27F54A2B625dA43B\"\n",
			"",
		);
		let result = ConfigLoader::new().load_from_str(&content);

		match result {
			Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("contract_address")),
			other => panic!("expected validation error, got {:?}", other),
		}
	}

	#[test]
	fn test_invalid_private_key_is_fatal() {
		let result = ConfigLoader::new().load_from_str(&sample("0xdeadbeef"));
		assert!(matches!(result, Err(ConfigError::ValidationError(_))));
	}

	#[test]
	fn test_env_override() {
		env::set_var("RELAYER_TEST_OVERRIDE_START_BLOCK", "1200");
		let config = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_OVERRIDE_")
			.load_from_str(&sample(KEY))
			.unwrap();

		assert_eq!(config.relayer.start_block, Some(1200));
	}

	#[tokio::test]
	async fn test_load_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(sample(KEY).as_bytes()).unwrap();

		let config = ConfigLoader::new()
			.with_env_prefix("RELAYER_TEST_FILE_")
			.with_file(file.path())
			.load()
			.await
			.unwrap();
		assert_eq!(config.exchange.implementation, "hyperliquid");

		let missing = ConfigLoader::new()
			.with_file("/nonexistent/relayer.toml")
			.load()
			.await;
		assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));
	}
}
