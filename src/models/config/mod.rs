//! Configuration loading and validation.
//!
//! The gateway reads a single JSON file describing the chain, its nodes, the
//! coordination store and the brokers.

#![allow(clippy::result_large_err)]

use async_trait::async_trait;
use std::path::Path;

mod error;
mod gateway_config;

pub use error::ConfigError;
pub use gateway_config::DEFAULT_CONFIG_PATH;

/// Common interface for loading configuration files
#[async_trait]
pub trait ConfigLoader: Sized {
	/// Load configuration from a specific file path
	///
	/// Secrets are resolved before the result is validated.
	async fn load_from_path(path: &Path) -> Result<Self, error::ConfigError>;

	/// Validate the configuration
	fn validate(&self) -> Result<(), error::ConfigError>;

	/// Logs a warning for every endpoint using an unencrypted protocol
	fn validate_protocol(&self);

	/// Check if a file is a JSON file based on extension
	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}

	/// Returns a copy with every secret replaced by its resolved plain value
	fn resolve_secrets(&self) -> Result<Self, ConfigError>;
}
