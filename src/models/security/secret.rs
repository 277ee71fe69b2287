//! Secret values read from configuration.
//!
//! A secret is either written inline or named by an environment variable. Resolved values
//! are wrapped in [`SecretString`], which zeroizes its memory on drop.

use serde::{Deserialize, Serialize};
use std::{env, fmt};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::security::error::{SecurityError, SecurityResult};

/// A secret that can be sourced from different places.
///
/// Serialized as `{"type": "plain" | "environment", "value": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ZeroizeOnDrop)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SecretValue {
	/// The secret itself
	#[serde(alias = "Plain", alias = "PLAIN")]
	Plain(SecretString),
	/// Name of the environment variable holding the secret
	#[serde(alias = "Environment", alias = "ENVIRONMENT")]
	Environment(String),
}

impl PartialEq for SecretValue {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Plain(l0), Self::Plain(r0)) => l0.as_str() == r0.as_str(),
			(Self::Environment(l0), Self::Environment(r0)) => l0 == r0,
			_ => false,
		}
	}
}

/// A string that zeroizes its contents when dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("SecretString(***)")
	}
}

impl SecretValue {
	/// Resolves the secret value based on its type.
	///
	/// # Errors
	/// Returns a `SecurityError` if the environment variable is not set or the resolved
	/// value is empty.
	pub async fn resolve(&self) -> SecurityResult<SecretString> {
		let resolved = match self {
			SecretValue::Plain(secret) => secret.clone(),
			SecretValue::Environment(env_var) => {
				env::var(env_var).map(SecretString::new).map_err(|e| {
					Box::new(SecurityError::parse_error(
						format!("Failed to get environment variable {}", env_var),
						Some(e.into()),
						None,
					))
				})?
			}
		};

		if resolved.as_str().trim().is_empty() {
			return Err(Box::new(SecurityError::validation_error(
				"Resolved secret is empty",
				None,
				None,
			)));
		}

		Ok(resolved)
	}

	/// Checks if the configured value (secret or variable name) is empty
	pub fn is_empty(&self) -> bool {
		match self {
			SecretValue::Plain(secret) => secret.as_str().trim().is_empty(),
			SecretValue::Environment(env_var) => env_var.trim().is_empty(),
		}
	}
}

impl Zeroize for SecretValue {
	fn zeroize(&mut self) {
		match self {
			SecretValue::Plain(secret) => secret.zeroize(),
			SecretValue::Environment(env_var) => env_var.clear(),
		}
	}
}

impl SecretString {
	pub fn new(value: String) -> Self {
		Self(value)
	}

	/// Exposes the secret. Use the reference immediately; do not store it.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for SecretString {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}

impl AsRef<str> for SecretString {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
