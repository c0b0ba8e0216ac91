//! Event publishing to the message brokers.

mod broker;
mod error;
mod service;

pub use broker::{with_heartbeat, BrokerConnection, BrokerConnector, FailureHook, LapinConnector};
pub use error::PublisherError;
pub use service::{
	AmqpEventPublisher, BrokerTarget, DisabledPublisher, EventPublisher, PublishOutcome,
	PublisherSettings,
};
