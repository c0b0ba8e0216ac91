//! Bootstrap module for wiring the gateway from its configuration.
//!
//! The chain family is matched once here; everything below it is generic over
//! the chain adapter.
//!
//! # Steps
//! - `load_config`: reads and validates the configuration file
//! - `initialize_store`: connects to the coordination store
//! - `clear_reconnect_lock`: drops a broker reconnect lock left by a crashed instance
//! - `create_publisher`: AMQP publisher, or a dropping stand-in without a wallet broker
//! - `build_gateway`: election, ingestion, recovery and the job service

use std::{error::Error, path::Path, sync::Arc};
use tokio::sync::watch;
use tokio_cron_scheduler::JobScheduler;
use tracing::{error, info, warn};

use crate::{
	models::{ChainFamily, ConfigLoader, GatewayConfig, Node},
	services::{
		blockchain::{
			BitcoinClient, ChainAdapter, ElectedNode, EthereumClient, HttpTransportClient,
		},
		coordination::{keys, CoordinationStore, RedisCoordinationStore},
		election::{NodeSelector, NodeSelectorTrait},
		gateway::{GatewayComponents, GatewayError, GatewayService, JobSchedulerTrait},
		ingestion::IngestionListener,
		publisher::{
			AmqpEventPublisher, DisabledPublisher, EventPublisher, LapinConnector,
			PublisherSettings,
		},
		recovery::RecoverySweeper,
		rpc::RpcService,
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Loads the gateway configuration from `path`, logging why it was rejected
pub async fn load_config(path: &Path) -> Result<GatewayConfig> {
	GatewayConfig::load_from_path(path).await.map_err(|e| {
		error!("Configuration validation failed: {}", e);
		e.into()
	})
}

/// Connects to the coordination store named in the configuration
pub async fn initialize_store(config: &GatewayConfig) -> Result<Arc<dyn CoordinationStore>> {
	let store = RedisCoordinationStore::connect(config.coordination.url.as_str()).await?;
	Ok(Arc::new(store))
}

/// Deletes the broker reconnect lock so the first connect is not blocked by a
/// lock left behind by a previous process
pub async fn clear_reconnect_lock(store: &dyn CoordinationStore) {
	if let Err(e) = store.del(&[keys::RECONNECT_LOCK_KEY.to_string()]).await {
		warn!(error = %e, "Failed to clear stale broker reconnect lock");
	}
}

/// Creates the event publisher for the configured brokers
pub fn create_publisher(
	config: &GatewayConfig,
	store: Arc<dyn CoordinationStore>,
) -> Arc<dyn EventPublisher> {
	match PublisherSettings::from_config(&config.broker) {
		Some(settings) => Arc::new(AmqpEventPublisher::new(
			config.blockchain.clone(),
			settings,
			Arc::new(LapinConnector::new(config.broker.heartbeat_secs)),
			store,
		)),
		None => {
			warn!("No wallet broker configured, events will be dropped");
			Arc::new(DisabledPublisher)
		}
	}
}

/// A gateway service and its query façade for one adapter type
pub struct GatewayHandle<A, J = JobScheduler>
where
	J: JobSchedulerTrait,
{
	pub service: GatewayService<A, J>,
	pub rpc: RpcService<A>,
}

/// Wires election, ingestion, recovery and publishing around `adapter`
pub async fn build_gateway<A, J>(
	config: &GatewayConfig,
	adapter: Arc<A>,
	sender: watch::Sender<Option<Node>>,
	store: Arc<dyn CoordinationStore>,
	publisher: Arc<dyn EventPublisher>,
) -> std::result::Result<GatewayHandle<A, J>, GatewayError>
where
	A: ChainAdapter + 'static,
	J: JobSchedulerTrait,
{
	let selector: Arc<dyn NodeSelectorTrait> = Arc::new(NodeSelector::new(
		adapter.clone(),
		config.nodes.clone(),
		sender,
		adapter.elected_node(),
	));

	let listener = Arc::new(IngestionListener::new(
		adapter.clone(),
		store.clone(),
		publisher.clone(),
		selector.clone(),
		config.ingestion.clone(),
	));

	let sweeper = Arc::new(RecoverySweeper::new(
		adapter.clone(),
		store,
		publisher.clone(),
	));

	let service = GatewayService::new(
		config.schedules.clone(),
		GatewayComponents {
			adapter: adapter.clone(),
			selector,
			publisher,
			listener,
			sweeper,
		},
	)
	.await?;

	Ok(GatewayHandle {
		service,
		rpc: RpcService::new(adapter),
	})
}

/// The running gateway, by chain family
pub enum Gateway {
	Bitcoin(GatewayHandle<BitcoinClient<HttpTransportClient>>),
	Ethereum(GatewayHandle<EthereumClient<HttpTransportClient>>),
}

impl Gateway {
	pub async fn start(&mut self) -> std::result::Result<(), GatewayError> {
		match self {
			Gateway::Bitcoin(handle) => handle.service.start().await,
			Gateway::Ethereum(handle) => handle.service.start().await,
		}
	}

	pub async fn stop(&mut self) -> std::result::Result<(), GatewayError> {
		match self {
			Gateway::Bitcoin(handle) => handle.service.stop().await,
			Gateway::Ethereum(handle) => handle.service.stop().await,
		}
	}
}

/// Builds the gateway for the configured chain family
pub async fn initialize_gateway(config: &GatewayConfig) -> Result<Gateway> {
	let store = initialize_store(config).await?;
	clear_reconnect_lock(store.as_ref()).await;

	let publisher = create_publisher(config, store.clone());
	let (sender, elected) = ElectedNode::channel();

	let gateway = match config.chain_family {
		ChainFamily::Bitcoin => {
			let adapter = Arc::new(BitcoinClient::new(config, elected)?);
			Gateway::Bitcoin(build_gateway(config, adapter, sender, store, publisher).await?)
		}
		ChainFamily::Ethereum => {
			let adapter = Arc::new(EthereumClient::new(config, elected)?);
			Gateway::Ethereum(build_gateway(config, adapter, sender, store, publisher).await?)
		}
	};

	info!(
		blockchain = %config.blockchain,
		family = %config.chain_family,
		nodes = config.nodes.len(),
		"Gateway initialized"
	);
	Ok(gateway)
}
