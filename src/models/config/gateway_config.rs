//! Gateway configuration loading and validation.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};

use crate::{
	models::{
		config::error::ConfigError, ChainFamily, ConfigLoader, GatewayConfig, SecretValue,
	},
	utils::{normalize_string, validate_cron_schedule},
};

/// Location used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.json";

fn resolve_secret(secret: &SecretValue, field: &str) -> Result<SecretValue, ConfigError> {
	let resolved = secret.resolve().map_err(|e| {
		ConfigError::parse_error(
			format!("failed to resolve {}: {}", field, e),
			Some(e),
			Some(HashMap::from([("field".to_string(), field.to_string())])),
		)
	})?;
	Ok(SecretValue::Plain(resolved))
}

fn resolve_optional(
	secret: &Option<SecretValue>,
	field: &str,
) -> Result<Option<SecretValue>, ConfigError> {
	secret
		.as_ref()
		.map(|value| resolve_secret(value, field))
		.transpose()
}

fn path_metadata(path: &Path) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"path".to_string(),
		path.display().to_string(),
	)]))
}

#[async_trait]
impl ConfigLoader for GatewayConfig {
	fn resolve_secrets(&self) -> Result<Self, ConfigError> {
		let mut config = self.clone();

		for node in &mut config.nodes {
			node.rpc_url = resolve_secret(&node.rpc_url, &format!("nodes.{}.rpc_url", node.name))?;
			node.username =
				resolve_optional(&node.username, &format!("nodes.{}.username", node.name))?;
			node.password =
				resolve_optional(&node.password, &format!("nodes.{}.password", node.name))?;
		}

		config.coordination.url = resolve_secret(&config.coordination.url, "coordination.url")?;
		config.broker.ledger_url = resolve_optional(&config.broker.ledger_url, "broker.ledger_url")?;
		config.broker.wallet_url = resolve_optional(&config.broker.wallet_url, "broker.wallet_url")?;

		Ok(config)
	}

	async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		if !Self::is_json_file(path) {
			return Err(ConfigError::file_error(
				"gateway config must be a .json file",
				None,
				path_metadata(path),
			));
		}

		let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::file_error(
				format!("failed to open gateway config file: {}", e),
				Some(Box::new(e)),
				path_metadata(path),
			)
		})?;

		let config: GatewayConfig = serde_json::from_str(&contents).map_err(|e| {
			ConfigError::parse_error(
				format!("failed to parse gateway config: {}", e),
				Some(Box::new(e)),
				path_metadata(path),
			)
		})?;

		let config = config.resolve_secrets()?;
		config.validate()?;

		Ok(config)
	}

	/// Validate the gateway configuration
	///
	/// Ensures that:
	/// - The blockchain name is set and at least one node is listed
	/// - Node names are unique
	/// - RPC URLs use http(s) and push endpoints match the chain family
	/// - Cron expressions parse and TTLs are non-zero
	fn validate(&self) -> Result<(), ConfigError> {
		if self.blockchain.trim().is_empty() {
			return Err(ConfigError::validation_error(
				"blockchain name is required",
				None,
				None,
			));
		}

		if self.nodes.is_empty() {
			return Err(ConfigError::validation_error(
				"at least one node is required",
				None,
				None,
			));
		}

		let mut seen: Vec<String> = Vec::with_capacity(self.nodes.len());
		for node in &self.nodes {
			let node_metadata = Some(HashMap::from([("node".to_string(), node.name.clone())]));

			if node.name.trim().is_empty() {
				return Err(ConfigError::validation_error(
					"node name is required",
					None,
					None,
				));
			}

			let normalized = normalize_string(&node.name);
			if seen.contains(&normalized) {
				return Err(ConfigError::validation_error(
					format!("Duplicate node name found: '{}'", node.name),
					None,
					node_metadata,
				));
			}
			seen.push(normalized);

			if !(node.rpc_url.starts_with("http://") || node.rpc_url.starts_with("https://")) {
				return Err(ConfigError::validation_error(
					"node RPC URLs must start with http:// or https://",
					None,
					node_metadata,
				));
			}

			let push_ok = match self.chain_family {
				ChainFamily::Bitcoin => node.notification_url.starts_with("tcp://"),
				ChainFamily::Ethereum => {
					node.notification_url.starts_with("ws://")
						|| node.notification_url.starts_with("wss://")
				}
			};
			if !push_ok {
				return Err(ConfigError::validation_error(
					format!(
						"notification URL of a {} node must start with {}",
						self.chain_family,
						match self.chain_family {
							ChainFamily::Bitcoin => "tcp://",
							ChainFamily::Ethereum => "ws:// or wss://",
						}
					),
					None,
					node_metadata,
				));
			}
		}

		for (name, expression) in [
			("node_selection", &self.schedules.node_selection),
			("unresolved_retry", &self.schedules.unresolved_retry),
			("gap_backfill", &self.schedules.gap_backfill),
		] {
			validate_cron_schedule(expression).map_err(|e| {
				ConfigError::validation_error(
					e,
					None,
					Some(HashMap::from([(
						"schedule".to_string(),
						name.to_string(),
					)])),
				)
			})?;
		}

		for (name, ttl) in [
			("tx_lock_ttl_secs", self.ingestion.tx_lock_ttl_secs),
			("block_lock_ttl_secs", self.ingestion.block_lock_ttl_secs),
			("unresolved_ttl_secs", self.ingestion.unresolved_ttl_secs),
			(
				"reconnect_lock_ttl_secs",
				self.broker.reconnect_lock_ttl_secs,
			),
		] {
			if ttl == 0 {
				return Err(ConfigError::validation_error(
					format!("{} must be greater than 0", name),
					None,
					None,
				));
			}
		}

		for (name, url) in [
			("broker.ledger_url", &self.broker.ledger_url),
			("broker.wallet_url", &self.broker.wallet_url),
		] {
			if let Some(url) = url {
				if !(url.starts_with("amqp://") || url.starts_with("amqps://")) {
					return Err(ConfigError::validation_error(
						format!("{} must start with amqp:// or amqps://", name),
						None,
						None,
					));
				}
			}
		}

		if self.broker.wallet_url.is_none() {
			tracing::warn!(
				blockchain = %self.blockchain,
				"No wallet broker configured, events will be logged and dropped"
			);
		}

		self.validate_protocol();

		Ok(())
	}

	fn validate_protocol(&self) {
		for node in &self.nodes {
			if node.rpc_url.starts_with("http://") {
				tracing::warn!("Node '{}' uses an insecure RPC URL", node.name);
			}
			if node.notification_url.starts_with("ws://") {
				tracing::warn!(
					"Node '{}' uses an insecure WebSocket URL: {}",
					node.name,
					node.notification_url
				);
			}
		}
		for url in [&self.broker.ledger_url, &self.broker.wallet_url]
			.into_iter()
			.flatten()
		{
			if url.starts_with("amqp://") {
				tracing::warn!("Broker connection for '{}' is not using TLS", self.blockchain);
			}
		}
	}
}
