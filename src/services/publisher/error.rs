//! Publisher error types and handling.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors raised while talking to the brokers
#[derive(ThisError, Debug)]
pub enum PublisherError {
	/// Opening a connection or channel failed
	#[error("Connection error: {0}")]
	ConnectionError(ErrorContext),

	/// Declaring or binding the exchange and queues failed
	#[error("Topology error: {0}")]
	TopologyError(ErrorContext),

	/// A message could not be published
	#[error("Publish error: {0}")]
	PublishError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl PublisherError {
	// Connection error
	pub fn connection_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConnectionError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Topology error
	pub fn topology_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::TopologyError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Publish error
	pub fn publish_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::PublishError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for PublisherError {
	fn trace_id(&self) -> String {
		match self {
			Self::ConnectionError(ctx) => ctx.trace_id.clone(),
			Self::TopologyError(ctx) => ctx.trace_id.clone(),
			Self::PublishError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
