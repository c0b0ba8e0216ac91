//! Blockchain node gateway entry point.
//!
//! Loads the gateway configuration, elects the authoritative node, mirrors its
//! blocks and transactions onto the message brokers and shuts down gracefully
//! on Ctrl+C.
//!
//! # Flow
//! 1. Loads the configuration (`config/gateway.json` or `--config`)
//! 2. Connects to the coordination store and the brokers
//! 3. Elects a node and subscribes to its notifications
//! 4. Runs the election, unresolved retry and gap backfill jobs
//! 5. Handles graceful shutdown on Ctrl+C

use chain_gateway::{
	bootstrap::{initialize_gateway, load_config, Result},
	models::DEFAULT_CONFIG_PATH,
	utils::{
		logging::setup_logging, metrics::server::create_metrics_server,
		parse_string_to_bytes_size,
	},
};

use clap::Parser;
use dotenvy::dotenv_override;
use std::{
	env::{set_var, var},
	path::PathBuf,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(
	name = "chain-gateway",
	about = "Keeps a pool of blockchain nodes, follows the most up-to-date one and republishes its blocks and transactions to message brokers.",
	version
)]
struct Cli {
	/// Write logs to file instead of stdout
	#[arg(long)]
	log_file: bool,

	/// Set log level (trace, debug, info, warn, error)
	#[arg(long, value_name = "LEVEL")]
	log_level: Option<String>,

	/// Path to store log files (default: logs/)
	#[arg(long, value_name = "PATH")]
	log_path: Option<String>,

	/// Maximum log file size before rolling (e.g., "1GB", "500MB", "1024KB")
	#[arg(long, value_name = "SIZE", value_parser = parse_string_to_bytes_size)]
	log_max_size: Option<u64>,

	/// Address to start the metrics server on (default: 127.0.0.1:8081)
	#[arg(long, value_name = "HOST:PORT")]
	metrics_address: Option<String>,

	/// Enable metrics server
	#[arg(long)]
	metrics: bool,

	/// Path to the gateway configuration file
	#[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
	config: PathBuf,

	/// Validate the configuration file without starting the service
	#[arg(long)]
	check: bool,
}

impl Cli {
	/// Apply CLI options to environment variables, overriding any existing values
	fn apply_to_env(&self) {
		dotenv_override().ok();

		if self.log_file {
			set_var("LOG_MODE", "file");
		}

		if let Ok(level) = var("RUST_LOG") {
			set_var("LOG_LEVEL", level);
		}

		if let Some(level) = &self.log_level {
			set_var("LOG_LEVEL", level);
			set_var("RUST_LOG", level);
		}

		if let Some(path) = &self.log_path {
			set_var("LOG_DATA_DIR", path);
		}

		if let Some(max_size) = &self.log_max_size {
			set_var("LOG_MAX_SIZE", max_size.to_string());
		}

		if self.metrics {
			set_var("METRICS_ENABLED", "true");
		}

		if let Some(address) = &self.metrics_address {
			if let Some(port) = address.split(':').nth(1) {
				set_var("METRICS_PORT", port);
			}
		}
	}
}

/// Main entry point for the gateway.
///
/// # Errors
/// Returns an error if the configuration is invalid or the gateway cannot be
/// initialized.
#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	cli.apply_to_env();

	setup_logging().unwrap_or_else(|e| {
		error!("Failed to setup logging: {}", e);
	});

	let config = load_config(&cli.config).await?;

	if cli.check {
		info!(
			path = %cli.config.display(),
			blockchain = %config.blockchain,
			nodes = config.nodes.len(),
			"Configuration is valid"
		);
		return Ok(());
	}

	let metrics_enabled =
		cli.metrics || var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false);

	let metrics_address = cli
		.metrics_address
		.clone()
		.or_else(|| var("METRICS_PORT").ok().map(|port| format!("127.0.0.1:{}", port)))
		.unwrap_or_else(|| "127.0.0.1:8081".to_string());

	let metrics_server = if metrics_enabled {
		match create_metrics_server(metrics_address) {
			Ok(server) => Some(server),
			Err(e) => {
				error!("Failed to create metrics server: {}", e);
				None
			}
		}
	} else {
		info!("Metrics server disabled. Use --metrics flag or METRICS_ENABLED=true to enable");
		None
	};

	let mut gateway = initialize_gateway(&config)
		.await
		.map_err(|e| anyhow::anyhow!("Failed to initialize gateway: {}", e))?;
	gateway.start().await?;

	info!("Service started. Press Ctrl+C to shutdown");

	let ctrl_c = tokio::signal::ctrl_c();

	if let Some(metrics_future) = metrics_server {
		tokio::select! {
			result = ctrl_c => {
				if let Err(e) = result {
					error!("Error waiting for Ctrl+C: {}", e);
				}
				info!("Shutdown signal received, stopping services...");
			}
			result = metrics_future => {
				if let Err(e) = result {
					error!("Metrics server error: {}", e);
				}
				info!("Metrics server stopped, shutting down services...");
			}
		}
	} else {
		let _ = ctrl_c.await;
		info!("Shutdown signal received, stopping services...");
	}

	if let Err(e) = gateway.stop().await {
		error!("Error during shutdown: {}", e);
	}

	info!("Shutdown complete");
	Ok(())
}
