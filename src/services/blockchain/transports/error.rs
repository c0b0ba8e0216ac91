//! Error types for node transports
//!
//! Separates JSON-RPC errors reported by the node from failures to talk to it.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
	/// Non-success HTTP status without a JSON-RPC error body
	#[error("HTTP error: status {status_code} from node {node}")]
	Http {
		status_code: reqwest::StatusCode,
		node: String,
		body: String,
		context: ErrorContext,
	},

	/// Connection, TLS or timeout failure
	#[error("Network error: {0}")]
	Network(ErrorContext),

	/// Response body was not valid JSON-RPC
	#[error("Failed to parse JSON response: {0}")]
	ResponseParse(ErrorContext),

	/// The node answered with a JSON-RPC `error` object
	#[error("RPC error {code}: {message}")]
	Rpc {
		code: i64,
		message: String,
		context: ErrorContext,
	},
}

impl TransportError {
	pub fn http(
		status_code: reqwest::StatusCode,
		node: String,
		body: String,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let msg = format!("HTTP error: status {} from node {}", status_code, node);

		Self::Http {
			status_code,
			node,
			body,
			context: ErrorContext::new_with_log(msg, source, metadata),
		}
	}

	pub fn network(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::Network(ErrorContext::new_with_log(msg, source, metadata))
	}

	pub fn response_parse(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ResponseParse(ErrorContext::new_with_log(msg, source, metadata))
	}

	/// Node-reported errors are expected traffic (unknown hash, bad params), so
	/// they are not logged at error level here.
	pub fn rpc(
		code: i64,
		message: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let message = message.into();
		Self::Rpc {
			code,
			context: ErrorContext::new(format!("RPC error {}: {}", code, message), None, metadata),
			message,
		}
	}
}

impl TraceableError for TransportError {
	fn trace_id(&self) -> String {
		match self {
			Self::Http { context, .. } => context.trace_id.clone(),
			Self::Network(ctx) => ctx.trace_id.clone(),
			Self::ResponseParse(ctx) => ctx.trace_id.clone(),
			Self::Rpc { context, .. } => context.trace_id.clone(),
		}
	}
}
