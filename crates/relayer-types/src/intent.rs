//! On-chain intent model.
//!
//! An intent is stored per user in the `IntentStorage` contract. Coins are
//! stored as zero-padded `bytes32` and amounts as 18-decimal fixed point
//! `uint256`; this module converts both to their off-chain representations.

use alloy_primitives::{FixedBytes, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Width of the padded coin identifier on chain.
pub const COIN_WIDTH: usize = 32;

/// Number of decimals used by on-chain fixed point amounts.
pub const WAD_DECIMALS: u32 = 18;

/// Errors raised while converting between on-chain and off-chain intent values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
	#[error("Coin symbol is {0} bytes, at most {COIN_WIDTH} fit in a bytes32")]
	CoinTooLong(usize),
	#[error("Coin field is not valid UTF-8: {0}")]
	InvalidCoin(String),
	#[error("Unknown side value: {0}")]
	InvalidSide(u8),
	#[error("Unknown status value: {0}")]
	InvalidStatus(u8),
	#[error("Amount out of range: {0}")]
	AmountOutOfRange(String),
}

/// Exchange venue an intent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
	Hyperliquid,
	Drift,
	Unknown,
}

impl Platform {
	/// Maps the raw contract enum value. Values the contract does not define
	/// collapse to `Unknown` rather than failing, so they are simply skipped.
	pub fn from_raw(value: u8) -> Self {
		match value {
			0 => Platform::Hyperliquid,
			1 => Platform::Drift,
			_ => Platform::Unknown,
		}
	}

	pub fn as_raw(self) -> u8 {
		match self {
			Platform::Hyperliquid => 0,
			Platform::Drift => 1,
			Platform::Unknown => 2,
		}
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Platform::Hyperliquid => write!(f, "Hyperliquid"),
			Platform::Drift => write!(f, "Drift"),
			Platform::Unknown => write!(f, "Unknown"),
		}
	}
}

/// Direction of the requested position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
	Long,
	Short,
}

impl Side {
	pub fn from_raw(value: u8) -> Result<Self, IntentError> {
		match value {
			0 => Ok(Side::Long),
			1 => Ok(Side::Short),
			other => Err(IntentError::InvalidSide(other)),
		}
	}

	pub fn as_raw(self) -> u8 {
		match self {
			Side::Long => 0,
			Side::Short => 1,
		}
	}

	/// Long positions are opened with a buy, shorts with a sell.
	pub fn is_buy(self) -> bool {
		matches!(self, Side::Long)
	}
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Side::Long => write!(f, "Long"),
			Side::Short => write!(f, "Short"),
		}
	}
}

/// Lifecycle status of a stored intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentStatus {
	None,
	Active,
	Cancelled,
}

impl IntentStatus {
	pub fn from_raw(value: u8) -> Result<Self, IntentError> {
		match value {
			0 => Ok(IntentStatus::None),
			1 => Ok(IntentStatus::Active),
			2 => Ok(IntentStatus::Cancelled),
			other => Err(IntentError::InvalidStatus(other)),
		}
	}

	pub fn is_active(self) -> bool {
		matches!(self, IntentStatus::Active)
	}
}

impl fmt::Display for IntentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IntentStatus::None => write!(f, "None"),
			IntentStatus::Active => write!(f, "Active"),
			IntentStatus::Cancelled => write!(f, "Cancelled"),
		}
	}
}

/// An intent as read back from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
	pub platform: Platform,
	pub coin: String,
	pub side: Side,
	pub size: Decimal,
	pub min_price: Decimal,
	/// Seconds since epoch of the last write to this intent.
	pub timestamp: u64,
	pub status: IntentStatus,
}

/// Pads a coin symbol into the fixed-width on-chain form.
pub fn encode_coin(symbol: &str) -> Result<FixedBytes<COIN_WIDTH>, IntentError> {
	let bytes = symbol.as_bytes();
	if bytes.len() > COIN_WIDTH {
		return Err(IntentError::CoinTooLong(bytes.len()));
	}

	let mut padded = [0u8; COIN_WIDTH];
	padded[..bytes.len()].copy_from_slice(bytes);
	Ok(FixedBytes::from(padded))
}

/// Strips the trailing zero padding and reads the remainder as text.
pub fn decode_coin(raw: &FixedBytes<COIN_WIDTH>) -> Result<String, IntentError> {
	let end = raw
		.iter()
		.rposition(|b| *b != 0)
		.map(|i| i + 1)
		.unwrap_or(0);

	std::str::from_utf8(&raw[..end])
		.map(str::to_string)
		.map_err(|_| IntentError::InvalidCoin(hex::encode(raw)))
}

/// Converts an 18-decimal fixed point amount into a decimal quantity.
pub fn from_wad(value: U256) -> Result<Decimal, IntentError> {
	let raw: u128 = value
		.try_into()
		.map_err(|_| IntentError::AmountOutOfRange(value.to_string()))?;
	let raw = i128::try_from(raw).map_err(|_| IntentError::AmountOutOfRange(value.to_string()))?;

	Decimal::try_from_i128_with_scale(raw, WAD_DECIMALS)
		.map(|d| d.normalize())
		.map_err(|_| IntentError::AmountOutOfRange(value.to_string()))
}

/// Converts a decimal quantity into 18-decimal fixed point. Digits beyond the
/// 18th decimal are rounded away.
pub fn to_wad(value: Decimal) -> Result<U256, IntentError> {
	if value.is_sign_negative() && !value.is_zero() {
		return Err(IntentError::AmountOutOfRange(value.to_string()));
	}

	let rounded = value.round_dp(WAD_DECIMALS);
	let mantissa = u128::try_from(rounded.mantissa())
		.map_err(|_| IntentError::AmountOutOfRange(value.to_string()))?;
	let scale_up = U256::from(10u64).pow(U256::from(WAD_DECIMALS - rounded.scale()));

	Ok(U256::from(mantissa) * scale_up)
}
