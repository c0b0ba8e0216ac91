//! Node transports.
//!
//! Requests are always addressed to an explicit node: the caller picks the
//! elected node (or a candidate being probed) and the transport only encodes,
//! sends and decodes one JSON-RPC exchange.

mod error;
mod http;

pub use error::TransportError;
pub use http::HttpTransportClient;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::Node;

/// JSON-RPC dialect spoken by a chain family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcVersion {
	/// Bitcoin-style 1.0: lowercase method names, `params` always an array
	V1,
	/// Ethereum-style 2.0
	V2,
}

impl JsonRpcVersion {
	/// Builds the request envelope for this dialect
	pub fn build_request(&self, id: &Value, method: &str, params: Value) -> Value {
		let params = if params.is_null() { json!([]) } else { params };
		match self {
			JsonRpcVersion::V1 => json!({
				"jsonrpc": "1.0",
				"id": id,
				"method": method.to_lowercase(),
				"params": params,
			}),
			JsonRpcVersion::V2 => json!({
				"jsonrpc": "2.0",
				"id": id,
				"method": method,
				"params": params,
			}),
		}
	}
}

/// Base trait for node transports
#[async_trait]
pub trait NodeTransport: Send + Sync {
	/// Dialect used to encode requests
	fn version(&self) -> JsonRpcVersion;

	/// Sends one request to `node` and returns the `result` member.
	///
	/// A JSON-RPC `error` member is returned as [`TransportError::Rpc`].
	async fn send_raw_request(
		&self,
		node: &Node,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, TransportError>;

	/// Customizes the request for specific chain requirements
	fn customize_request(&self, id: &Value, method: &str, params: Value) -> Value {
		self.version().build_request(id, method, params)
	}
}
