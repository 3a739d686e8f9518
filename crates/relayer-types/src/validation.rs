//! Configuration validation for relayer backends.
//!
//! Each pluggable backend describes the TOML table it expects as a
//! [`Schema`]; the loader validates the table before the backend is built, so
//! a missing RPC URL or malformed key is reported at start-up.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		actual: &'static str,
	},
}

impl ValidationError {
	/// Qualifies the offending field with the table it was found in.
	fn within(self, table: &str) -> Self {
		match self {
			ValidationError::MissingField(field) => {
				ValidationError::MissingField(format!("{}.{}", table, field))
			}
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", table, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", table, field),
				expected,
				actual,
			},
		}
	}
}

/// Shape a configuration value must have.
#[derive(Debug)]
pub enum FieldType {
	Boolean,
	/// An `http://` or `https://` endpoint.
	Url,
	/// A 20-byte hex address with `0x` prefix.
	Address,
	/// A 32-byte hex private key, `0x` prefix optional.
	PrivateKey,
	Table(Schema),
}

#[derive(Debug)]
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
		}
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		let name = self.name.as_str();
		let text = || {
			value.as_str().ok_or_else(|| ValidationError::TypeMismatch {
				field: name.to_string(),
				expected: "string",
				actual: value.type_str(),
			})
		};
		let invalid = |message: &str| ValidationError::InvalidValue {
			field: name.to_string(),
			message: message.to_string(),
		};

		match &self.field_type {
			FieldType::Boolean if !value.is_bool() => Err(ValidationError::TypeMismatch {
				field: name.to_string(),
				expected: "boolean",
				actual: value.type_str(),
			}),
			FieldType::Boolean => Ok(()),
			FieldType::Url => {
				let url = text()?;
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err(invalid("URL must start with http:// or https://"))
				}
			}
			FieldType::Address => match text()?.strip_prefix("0x") {
				Some(digits) if is_hex_of_len(digits, 20) => Ok(()),
				_ => Err(invalid("must be a 0x-prefixed 20-byte hex address")),
			},
			FieldType::PrivateKey => {
				let key = text()?;
				if is_hex_of_len(key.strip_prefix("0x").unwrap_or(key), 32) {
					Ok(())
				} else {
					Err(invalid("Private key must be 64 hex characters (32 bytes)"))
				}
			}
			FieldType::Table(schema) => schema.validate(value).map_err(|e| e.within(name)),
		}
	}
}

/// Required and optional fields of one TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config.as_table().ok_or(ValidationError::TypeMismatch {
			field: "root".to_string(),
			expected: "table",
			actual: config.type_str(),
		})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn is_hex_of_len(value: &str, bytes: usize) -> bool {
	value.len() == bytes * 2 && hex::decode(value).is_ok()
}

/// Implemented by every backend that is configured from a TOML table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ledger_schema() -> Schema {
		Schema::new(
			vec![
				Field::new("rpc_url", FieldType::Url),
				Field::new("contract_address", FieldType::Address),
			],
			vec![Field::new("archive", FieldType::Boolean)],
		)
	}

	fn parse(text: &str) -> toml::Value {
		toml::from_str(text).unwrap()
	}

	#[test]
	fn test_valid_table() {
		let config = parse(
			r#"
			rpc_url = "https://arb1.arbitrum.io/rpc"
			contract_address = "0x4988BCB69356B55b3Eb645Cc27F54A2B625dA43B"
			archive = true
			"#,
		);

		assert!(ledger_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_required_field() {
		let config = parse(r#"rpc_url = "http://localhost:8545""#);

		assert_eq!(
			ledger_schema().validate(&config),
			Err(ValidationError::MissingField("contract_address".to_string()))
		);
	}

	#[test]
	fn test_rejects_bad_values() {
		let config = parse(
			r#"
			rpc_url = "ws://localhost:8545"
			contract_address = "0x1234"
			"#,
		);
		assert!(matches!(
			ledger_schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "rpc_url"
		));

		let config = parse(
			r#"
			rpc_url = "http://localhost:8545"
			contract_address = "0x1234"
			"#,
		);
		assert!(matches!(
			ledger_schema().validate(&config),
			Err(ValidationError::InvalidValue { field, .. }) if field == "contract_address"
		));
	}

	#[test]
	fn test_optional_field_type() {
		let config = parse(
			r#"
			rpc_url = "http://localhost:8545"
			contract_address = "0x0000000000000000000000000000000000000001"
			archive = "yes"
			"#,
		);

		assert_eq!(
			ledger_schema().validate(&config),
			Err(ValidationError::TypeMismatch {
				field: "archive".to_string(),
				expected: "boolean",
				actual: "string",
			})
		);
	}

	#[test]
	fn test_private_key_in_nested_table() {
		let schema = Schema::new(
			vec![Field::new(
				"account",
				FieldType::Table(Schema::new(
					vec![Field::new("private_key", FieldType::PrivateKey)],
					vec![],
				)),
			)],
			vec![],
		);

		let good = parse(&format!("[account]\nprivate_key = \"0x{}\"", "ab".repeat(32)));
		assert!(schema.validate(&good).is_ok());

		let bad = parse("[account]\nprivate_key = \"0xabc\"");
		assert!(matches!(
			schema.validate(&bad),
			Err(ValidationError::InvalidValue { field, .. }) if field == "account.private_key"
		));

		assert_eq!(
			schema.validate(&parse("[other]")),
			Err(ValidationError::MissingField("account".to_string()))
		);
	}
}
