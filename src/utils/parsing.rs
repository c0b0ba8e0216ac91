//! Parsing utilities
//!
//! Small parsers shared by the CLI, the chain clients and the recovery keys.

use byte_unit::Byte;
use std::str::FromStr;

/// Parses a human-readable size such as "1GB", "500MB" or "1024KiB" into bytes.
pub fn parse_string_to_bytes_size(s: &str) -> Result<u64, String> {
	match Byte::from_str(s) {
		Ok(byte) => Ok(byte.as_u64()),
		Err(e) => Err(format!("Invalid size format: '{}'. Error: {}", s, e)),
	}
}

/// Parses an Ethereum hex quantity (`"0x1b4"`) into a `u64`.
///
/// The `0x` prefix is optional and stripped once. Empty digits and anything
/// that is not a hex digit are rejected.
pub fn parse_hex_quantity(value: &str) -> Option<u64> {
	let digits = value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))
		.unwrap_or(value);
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
		return None;
	}
	u64::from_str_radix(digits, 16).ok()
}

/// Formats a number as an Ethereum hex quantity without leading zeros.
pub fn to_hex_quantity(value: u64) -> String {
	format!("0x{:x}", value)
}

/// Normalizes a string by trimming whitespace and converting to lowercase.
pub fn normalize_string(input: &str) -> String {
	input.trim().to_lowercase()
}
