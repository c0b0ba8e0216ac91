//! Secret handling for node credentials and broker/coordination URLs.
//!
//! Secrets can be written inline in the configuration file or referenced through
//! an environment variable. Both forms are zeroized when dropped.

use serde::{Deserialize, Serialize};
use std::{env, fmt};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::models::security::error::{SecurityError, SecurityResult};

/// A secret value and the place it is sourced from.
///
/// - `Plain`: the secret itself, wrapped in a `SecretString`
/// - `Environment`: the name of an environment variable holding the secret
///
/// The tag is matched case-insensitively on the way in (`"plain"`, `"Plain"`,
/// `"ENVIRONMENT"` all work).
#[derive(Debug, Clone, Serialize, ZeroizeOnDrop)]
#[serde(tag = "type", content = "value")]
#[serde(deny_unknown_fields)]
pub enum SecretValue {
	/// A plain text secret value
	Plain(SecretString),
	/// A secret stored in an environment variable
	Environment(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSecretValue {
	#[serde(rename = "type")]
	kind: String,
	value: String,
}

impl<'de> Deserialize<'de> for SecretValue {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = RawSecretValue::deserialize(deserializer)?;
		match raw.kind.to_lowercase().as_str() {
			"plain" => Ok(SecretValue::Plain(SecretString::new(raw.value))),
			"environment" => Ok(SecretValue::Environment(raw.value)),
			other => Err(serde::de::Error::unknown_variant(
				other,
				&["plain", "environment"],
			)),
		}
	}
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

/// A string that is zeroized when dropped.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl SecretValue {
	/// Shorthand for an inline secret
	pub fn plain(value: impl Into<String>) -> Self {
		SecretValue::Plain(SecretString::new(value.into()))
	}

	/// Resolves the secret from its source.
	///
	/// # Errors
	///
	/// Returns a `SecurityError` when the referenced environment variable is unset or empty.
	pub fn resolve(&self) -> SecurityResult<SecretString> {
		match self {
			SecretValue::Plain(secret) => Ok(secret.clone()),
			SecretValue::Environment(env_var) => {
				let value = env::var(env_var).map_err(|e| {
					Box::new(SecurityError::parse_error(
						format!("Failed to get environment variable {}", env_var),
						Some(e.into()),
						None,
					))
				})?;
				if value.trim().is_empty() {
					return Err(Box::new(SecurityError::validation_error(
						format!("Environment variable {} is empty", env_var),
						None,
						None,
					)));
				}
				Ok(SecretString::new(value))
			}
		}
	}

	/// Checks if the secret value starts with a given prefix
	pub fn starts_with(&self, prefix: &str) -> bool {
		self.as_str().starts_with(prefix)
	}

	/// Checks if the secret value is empty
	pub fn is_empty(&self) -> bool {
		self.as_str().trim().is_empty()
	}

	/// Returns the secret value, or the variable name for `Environment`
	pub fn as_str(&self) -> &str {
		match self {
			SecretValue::Plain(secret) => secret.as_str(),
			SecretValue::Environment(env_var) => env_var,
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
	/// Creates a new `SecretString` with the given value.
	pub fn new(value: String) -> Self {
		Self(value)
	}

	/// Gets a reference to the underlying string.
	///
	/// The reference should be used immediately and not stored.
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

/// Plain secrets are never rendered; environment references show the variable name.
impl fmt::Display for SecretValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SecretValue::Plain(_) => write!(f, "***"),
			SecretValue::Environment(env_var) => write!(f, "${}", env_var),
		}
	}
}

impl AsRef<str> for SecretValue {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}
