//! Blockchain service error types and handling.
//!
//! User-facing adapter operations surface node-reported failures with the
//! node's own code and message so they can be relayed to API callers.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors that can occur during blockchain operations
#[derive(ThisError, Debug)]
pub enum BlockChainError {
	/// The node could not be reached or answered with something other than JSON-RPC
	#[error("Connection error: {0}")]
	ConnectionError(ErrorContext),

	/// The node answered with a JSON-RPC error object
	#[error("Node error {code}: {message}")]
	NodeError {
		code: i64,
		message: String,
		context: ErrorContext,
	},

	/// No node is currently elected
	#[error("No node available: {0}")]
	NoElectedNode(ErrorContext),

	/// Malformed request arguments or unexpected response shapes
	#[error("Request error: {0}")]
	RequestError(ErrorContext),

	/// A block needed to complete a range could not be resolved
	#[error("Block not found: {0}")]
	BlockNotFound(ErrorContext),

	/// Push subscription could not be established or broke
	#[error("Subscription error: {0}")]
	SubscriptionError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl BlockChainError {
	// Connection error
	pub fn connection_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConnectionError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Node-reported error
	pub fn node_error(
		code: i64,
		message: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let message = message.into();
		Self::NodeError {
			code,
			context: ErrorContext::new_with_log(
				format!("node returned error {}: {}", code, message),
				None,
				metadata,
			),
			message,
		}
	}

	// No elected node
	pub fn no_elected_node(
		msg: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::NoElectedNode(ErrorContext::new_with_log(msg, None, metadata))
	}

	// Request error
	pub fn request_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RequestError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Block not found
	pub fn block_not_found(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::BlockNotFound(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Subscription error
	pub fn subscription_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SubscriptionError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for BlockChainError {
	fn trace_id(&self) -> String {
		match self {
			Self::ConnectionError(ctx) => ctx.trace_id.clone(),
			Self::NodeError { context, .. } => context.trace_id.clone(),
			Self::NoElectedNode(ctx) => ctx.trace_id.clone(),
			Self::RequestError(ctx) => ctx.trace_id.clone(),
			Self::BlockNotFound(ctx) => ctx.trace_id.clone(),
			Self::SubscriptionError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
