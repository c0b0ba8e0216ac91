//! Event publisher.
//!
//! Keeps the ledger (optional) and wallet broker connections. A shared lock in
//! the coordination store makes sure only one instance connects at a time. On
//! a failure, the lock is released after a delay and the connect runs again.
//! Events that carry a block number and fail to publish are recorded in the
//! gap skip-list for backfill.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{runtime::Handle, sync::RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
	models::{BrokerConfig, Event, ExchangeTopology},
	services::{
		coordination::{keys, try_acquire_lock, CoordinationStore},
		publisher::{
			broker::{BrokerConnection, BrokerConnector, FailureHook},
			error::PublisherError,
		},
	},
	utils::metrics::{BLOCKS_DEFERRED, BROKER_RECONNECTS, EVENTS_PUBLISHED, PUBLISH_FAILURES},
};

/// What happened to an event handed to the publisher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
	/// Published on every configured exchange
	Published,
	/// Not published; its block number was recorded for backfill
	Deferred,
	/// Not published and not recorded
	Dropped,
}

/// Publishes events to the brokers
#[async_trait]
pub trait EventPublisher: Send + Sync {
	/// Connects to the brokers and declares their topology
	///
	/// # Returns
	/// * `Result<bool, PublisherError>` - `Ok(true)` once connected, `Ok(false)`
	///   when another connect holds the reconnect lock. On failure a retry is
	///   scheduled before the error is returned
	async fn connect(&self) -> Result<bool, PublisherError>;

	/// Publishes `event` on every configured exchange
	///
	/// # Arguments
	/// * `event` - Event to publish
	/// * `block_number` - Height recorded in the gap skip-list if the publish fails
	///
	/// # Returns
	/// * `PublishOutcome` - `Deferred` when the failure was recorded for
	///   backfill, `Dropped` when it was not
	async fn send_to_exchange(&self, event: &Event, block_number: Option<u64>) -> PublishOutcome;

	/// Stops reconnecting and closes the connections
	async fn close(&self);
}

/// One broker endpoint and the topology declared on it
#[derive(Debug, Clone)]
pub struct BrokerTarget {
	pub url: String,
	pub topology: ExchangeTopology,
}

/// Resolved broker settings
#[derive(Debug, Clone)]
pub struct PublisherSettings {
	pub ledger: Option<BrokerTarget>,
	pub wallet: BrokerTarget,
	pub reconnect_delay: Duration,
	pub reconnect_lock_ttl_secs: u64,
}

impl PublisherSettings {
	/// `None` without a wallet broker
	pub fn from_config(config: &BrokerConfig) -> Option<Self> {
		let wallet_url = config.wallet_url.as_ref()?;
		Some(Self {
			ledger: config.ledger_url.as_ref().map(|url| BrokerTarget {
				url: url.as_str().to_string(),
				topology: config.ledger.clone(),
			}),
			wallet: BrokerTarget {
				url: wallet_url.as_str().to_string(),
				topology: config.wallet.clone(),
			},
			reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
			reconnect_lock_ttl_secs: config.reconnect_lock_ttl_secs,
		})
	}
}

#[derive(Default)]
struct Connections {
	ledger: Option<Box<dyn BrokerConnection>>,
	wallet: Option<Box<dyn BrokerConnection>>,
	/// Bumped on every connect so hooks of replaced connections are ignored
	generation: u64,
}

impl Connections {
	fn take(&mut self) -> Vec<Box<dyn BrokerConnection>> {
		self.ledger.take().into_iter().chain(self.wallet.take()).collect()
	}
}

struct PublisherInner {
	blockchain: String,
	settings: PublisherSettings,
	connector: Arc<dyn BrokerConnector>,
	store: Arc<dyn CoordinationStore>,
	connections: RwLock<Connections>,
	shutdown: CancellationToken,
}

/// AMQP event publisher
pub struct AmqpEventPublisher {
	inner: Arc<PublisherInner>,
}

impl AmqpEventPublisher {
	pub fn new(
		blockchain: impl Into<String>,
		settings: PublisherSettings,
		connector: Arc<dyn BrokerConnector>,
		store: Arc<dyn CoordinationStore>,
	) -> Self {
		Self {
			inner: Arc::new(PublisherInner {
				blockchain: blockchain.into(),
				settings,
				connector,
				store,
				connections: RwLock::new(Connections::default()),
				shutdown: CancellationToken::new(),
			}),
		}
	}
}

impl PublisherInner {
	fn failure_hook(self: &Arc<Self>, generation: u64) -> FailureHook {
		let weak = Arc::downgrade(self);
		let handle = Handle::current();
		Arc::new(move || {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			handle.spawn(async move {
				if inner.shutdown.is_cancelled() {
					return;
				}
				if inner.connections.read().await.generation != generation {
					return;
				}
				let _ = inner.connect().await;
			});
		})
	}

	async fn release_lock(&self) {
		if let Err(e) = self
			.store
			.del(&[keys::RECONNECT_LOCK_KEY.to_string()])
			.await
		{
			warn!(error = %e, "Failed to release broker reconnect lock");
		}
	}

	async fn open_all(
		self: &Arc<Self>,
		generation: u64,
	) -> Result<(Option<Box<dyn BrokerConnection>>, Box<dyn BrokerConnection>), PublisherError> {
		let ledger = match &self.settings.ledger {
			Some(target) => Some(
				self.connector
					.open(&target.url, &target.topology, self.failure_hook(generation))
					.await?,
			),
			None => None,
		};

		let wallet = &self.settings.wallet;
		let wallet = match self
			.connector
			.open(&wallet.url, &wallet.topology, self.failure_hook(generation))
			.await
		{
			Ok(wallet) => wallet,
			Err(e) => {
				if let Some(ledger) = ledger {
					ledger.close().await;
				}
				return Err(e);
			}
		};

		Ok((ledger, wallet))
	}

	fn schedule_retry(self: &Arc<Self>) {
		let inner = self.clone();
		tokio::spawn(async move {
			tokio::select! {
				_ = inner.shutdown.cancelled() => return,
				_ = tokio::time::sleep(inner.settings.reconnect_delay) => {}
			}
			inner.release_lock().await;
			let _ = inner.connect().await;
		});
	}

	fn connect(self: Arc<Self>) -> BoxFuture<'static, Result<bool, PublisherError>> {
		Box::pin(async move {
			if self.shutdown.is_cancelled() {
				return Ok(false);
			}

			let acquired = try_acquire_lock(
				self.store.as_ref(),
				keys::RECONNECT_LOCK_KEY,
				self.settings.reconnect_lock_ttl_secs,
			)
			.await;
			if !acquired {
				debug!("Broker connect already in progress");
				return Ok(false);
			}

			let generation = {
				let mut connections = self.connections.write().await;
				for connection in connections.take() {
					connection.close().await;
				}
				connections.generation += 1;
				connections.generation
			};

			debug!("Connecting to brokers");
			match self.open_all(generation).await {
				Ok((ledger, wallet)) => {
					{
						let mut connections = self.connections.write().await;
						connections.ledger = ledger;
						connections.wallet = Some(wallet);
					}
					self.release_lock().await;
					BROKER_RECONNECTS.with_label_values(&["connected"]).inc();
					info!("Connected to brokers");
					Ok(true)
				}
				Err(e) => {
					BROKER_RECONNECTS.with_label_values(&["failed"]).inc();
					error!(
						delay_ms = self.settings.reconnect_delay.as_millis() as u64,
						"Broker connect failed, retrying"
					);
					self.schedule_retry();
					Err(e)
				}
			}
		})
	}

	async fn publish(&self, payload: &[u8]) -> Result<(), PublisherError> {
		let connections = self.connections.read().await;
		let mut targets = Vec::with_capacity(2);
		if let Some(ledger) = &self.settings.ledger {
			targets.push((&ledger.topology.exchange, connections.ledger.as_ref()));
		}
		targets.push((
			&self.settings.wallet.topology.exchange,
			connections.wallet.as_ref(),
		));

		for (exchange, connection) in targets {
			match connection {
				Some(connection) if connection.is_connected() => {
					connection.publish(payload).await?
				}
				_ => {
					return Err(PublisherError::publish_error(
						"Broker disconnected",
						None,
						Some(HashMap::from([(
							"exchange".to_string(),
							exchange.to_string(),
						)])),
					))
				}
			}
		}
		Ok(())
	}
}

#[async_trait]
impl EventPublisher for AmqpEventPublisher {
	async fn connect(&self) -> Result<bool, PublisherError> {
		self.inner.clone().connect().await
	}

	async fn send_to_exchange(&self, event: &Event, block_number: Option<u64>) -> PublishOutcome {
		let blockchain = self.inner.blockchain.as_str();
		let kind = event.kind().pattern();

		let payload = match serde_json::to_vec(&event.to_message()) {
			Ok(payload) => payload,
			Err(e) => {
				error!(error = %e, "Failed to encode event");
				return PublishOutcome::Dropped;
			}
		};

		let Err(e) = self.inner.publish(&payload).await else {
			EVENTS_PUBLISHED.with_label_values(&[blockchain, kind]).inc();
			return PublishOutcome::Published;
		};

		PUBLISH_FAILURES.with_label_values(&[blockchain, kind]).inc();
		error!(error = %e, kind = %kind, "Cannot publish event, broker disconnected");

		let Some(number) = block_number else {
			return PublishOutcome::Dropped;
		};
		match self.inner.store.set(&keys::gap_key(number), "").await {
			Ok(()) => {
				BLOCKS_DEFERRED.with_label_values(&[blockchain]).inc();
				info!(block = number, "Block recorded for backfill");
				PublishOutcome::Deferred
			}
			Err(e) => {
				error!(block = number, error = %e, "Failed to record block for backfill");
				PublishOutcome::Dropped
			}
		}
	}

	async fn close(&self) {
		self.inner.shutdown.cancel();
		let mut connections = self.inner.connections.write().await;
		for connection in connections.take() {
			connection.close().await;
		}
		connections.generation += 1;
	}
}

/// Stand-in when no wallet broker is configured: events are logged and dropped
pub struct DisabledPublisher;

#[async_trait]
impl EventPublisher for DisabledPublisher {
	async fn connect(&self) -> Result<bool, PublisherError> {
		Ok(false)
	}

	async fn send_to_exchange(&self, event: &Event, _block_number: Option<u64>) -> PublishOutcome {
		debug!(
			kind = %event.kind().pattern(),
			"No wallet broker configured, dropping event"
		);
		PublishOutcome::Dropped
	}

	async fn close(&self) {}
}
