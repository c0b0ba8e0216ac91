//! Broker connections.
//!
//! [`BrokerConnector`] opens one connection with its channel and declares the
//! topology on it. [`LapinConnector`] does this over AMQP 0-9-1.

use async_trait::async_trait;
use lapin::{
	options::{
		BasicPublishOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
		QueueDeclareOptions,
	},
	types::FieldTable,
	BasicProperties, Channel, Connection, ConnectionProperties,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error};
use url::Url;

use crate::{
	models::{ExchangeKind, ExchangeTopology},
	services::publisher::error::PublisherError,
};

/// Called when an open connection reports an error or is closed by the peer
pub type FailureHook = Arc<dyn Fn() + Send + Sync>;

/// An open connection with one channel bound to its exchange
#[async_trait]
pub trait BrokerConnection: Send + Sync {
	/// Publishes `payload` to the exchange with an empty routing key
	async fn publish(&self, payload: &[u8]) -> Result<(), PublisherError>;

	fn is_connected(&self) -> bool;

	/// Closes the connection; errors are ignored
	async fn close(&self);
}

/// Opens broker connections
#[async_trait]
pub trait BrokerConnector: Send + Sync {
	/// Connects to `url`, opens a channel, applies the prefetch and declares
	/// the exchange and bound queues
	async fn open(
		&self,
		url: &str,
		topology: &ExchangeTopology,
		on_failure: FailureHook,
	) -> Result<Box<dyn BrokerConnection>, PublisherError>;
}

/// Appends `heartbeat` to the connection URI unless it is already set
pub fn with_heartbeat(url: &str, heartbeat_secs: u16) -> Result<String, url::ParseError> {
	let mut parsed = Url::parse(url)?;
	if !parsed.query_pairs().any(|(key, _)| key == "heartbeat") {
		parsed
			.query_pairs_mut()
			.append_pair("heartbeat", &heartbeat_secs.to_string());
	}
	Ok(parsed.to_string())
}

fn exchange_kind(kind: ExchangeKind) -> lapin::ExchangeKind {
	match kind {
		ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
		ExchangeKind::Direct => lapin::ExchangeKind::Direct,
		ExchangeKind::Topic => lapin::ExchangeKind::Topic,
		ExchangeKind::Headers => lapin::ExchangeKind::Headers,
	}
}

fn exchange_metadata(exchange: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([(
		"exchange".to_string(),
		exchange.to_string(),
	)]))
}

/// AMQP connector built on `lapin`
pub struct LapinConnector {
	heartbeat_secs: u16,
}

impl LapinConnector {
	pub fn new(heartbeat_secs: u16) -> Self {
		Self { heartbeat_secs }
	}

	async fn declare(channel: &Channel, topology: &ExchangeTopology) -> Result<(), lapin::Error> {
		channel
			.basic_qos(
				topology.prefetch_count,
				BasicQosOptions {
					global: topology.global_prefetch,
				},
			)
			.await?;

		channel
			.exchange_declare(
				&topology.exchange,
				exchange_kind(topology.exchange_kind),
				ExchangeDeclareOptions {
					durable: topology.durable,
					..Default::default()
				},
				FieldTable::default(),
			)
			.await?;

		for queue in &topology.queues {
			channel
				.queue_declare(
					queue,
					QueueDeclareOptions {
						durable: topology.durable,
						..Default::default()
					},
					FieldTable::default(),
				)
				.await?;
			channel
				.queue_bind(
					queue,
					&topology.exchange,
					"",
					QueueBindOptions::default(),
					FieldTable::default(),
				)
				.await?;
		}

		Ok(())
	}
}

#[async_trait]
impl BrokerConnector for LapinConnector {
	async fn open(
		&self,
		url: &str,
		topology: &ExchangeTopology,
		on_failure: FailureHook,
	) -> Result<Box<dyn BrokerConnection>, PublisherError> {
		let uri = with_heartbeat(url, self.heartbeat_secs).map_err(|e| {
			PublisherError::connection_error(
				"Invalid broker URL",
				Some(Box::new(e)),
				exchange_metadata(&topology.exchange),
			)
		})?;

		let connection = Connection::connect(&uri, ConnectionProperties::default())
			.await
			.map_err(|e| {
				PublisherError::connection_error(
					"Failed to connect to broker",
					Some(Box::new(e)),
					exchange_metadata(&topology.exchange),
				)
			})?;

		let exchange = topology.exchange.clone();
		connection.on_error(move |e| {
			error!(exchange = %exchange, error = %e, "Broker connection failed");
			on_failure();
		});

		let channel = connection.create_channel().await.map_err(|e| {
			PublisherError::connection_error(
				"Failed to open broker channel",
				Some(Box::new(e)),
				exchange_metadata(&topology.exchange),
			)
		})?;

		Self::declare(&channel, topology).await.map_err(|e| {
			PublisherError::topology_error(
				"Failed to declare broker topology",
				Some(Box::new(e)),
				exchange_metadata(&topology.exchange),
			)
		})?;

		debug!(exchange = %topology.exchange, queues = ?topology.queues, "Broker topology declared");

		Ok(Box::new(LapinConnection {
			connection,
			channel,
			exchange: topology.exchange.clone(),
		}))
	}
}

struct LapinConnection {
	connection: Connection,
	channel: Channel,
	exchange: String,
}

#[async_trait]
impl BrokerConnection for LapinConnection {
	async fn publish(&self, payload: &[u8]) -> Result<(), PublisherError> {
		self.channel
			.basic_publish(
				&self.exchange,
				"",
				BasicPublishOptions::default(),
				payload,
				BasicProperties::default(),
			)
			.await
			.map_err(|e| {
				PublisherError::publish_error(
					"Failed to publish message",
					Some(Box::new(e)),
					exchange_metadata(&self.exchange),
				)
			})?;
		Ok(())
	}

	fn is_connected(&self) -> bool {
		self.connection.status().connected() && self.channel.status().connected()
	}

	async fn close(&self) {
		if let Err(e) = self.connection.close(200, "closing").await {
			debug!(exchange = %self.exchange, error = %e, "Ignoring broker close failure");
		}
	}
}
