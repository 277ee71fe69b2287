//! Parsing utilities
//!
//! Helpers for CLI arguments and for pulling transaction ids out of free-form chat text.

use byte_unit::Byte;
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;

use crate::utils::constants::DEFAULT_TARGET_CONFIRMATIONS;

lazy_static! {
	/// Matches a bare txid or an explorer link ending in one, e.g.
	/// `https://mempool.space/tx/<txid>` or `.../#tx=<txid>`.
	static ref TXID_PATTERN: Regex =
		Regex::new(r"^(?:.*[/#=])?((?:0x)?[a-fA-F0-9]{64})(?:/.*)?$").unwrap();
}

/// Parses a string argument into a `u64` value representing a file size.
///
/// Accepts human-readable formats like "1GB", "500MB", "1024KB", etc.
/// Returns an error if the format is invalid.
pub fn parse_string_to_bytes_size(s: &str) -> Result<u64, String> {
	match Byte::from_str(s) {
		Ok(byte) => Ok(byte.as_u64()),
		Err(e) => Err(format!("Invalid size format: '{}'. Error: {}", s, e)),
	}
}

/// Extracts a transaction id from a token that is either the txid itself or a link to it.
///
/// # Arguments
/// * `token` - A single whitespace-free token
///
/// # Returns
/// * `Option<String>` - The txid, with any `0x` prefix preserved
pub fn extract_txid(token: &str) -> Option<String> {
	TXID_PATTERN
		.captures(token.trim())
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str().to_string())
}

/// Parses `<txid-or-link> [confirmations]` as sent in a chat message.
///
/// A missing confirmation count defaults to 1. A present but non-numeric count makes the
/// whole message unparseable.
pub fn parse_tracking_arguments(text: &str) -> Option<(String, u64)> {
	let mut parts = text.split_whitespace();
	let txid = extract_txid(parts.next()?)?;

	let confirmations = match parts.next() {
		Some(raw) => raw.parse::<u64>().ok()?,
		None => DEFAULT_TARGET_CONFIRMATIONS,
	};

	Some((txid, confirmations))
}
