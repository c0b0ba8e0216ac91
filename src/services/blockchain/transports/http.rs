//! HTTP transport implementation for node JSON-RPC.
//!
//! One pooled, retrying client is shared by every node of the gateway; the node
//! URL and credentials are applied per request.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::collections::HashMap;

use crate::{
	models::Node,
	services::blockchain::transports::{JsonRpcVersion, NodeTransport, TransportError},
	utils::http::{create_node_http_client, RetryConfig},
};

/// JSON-RPC over HTTP(S) with optional basic auth
#[derive(Clone, Debug)]
pub struct HttpTransportClient {
	/// Retryable HTTP client for making requests
	pub client: ClientWithMiddleware,
	version: JsonRpcVersion,
}

impl HttpTransportClient {
	/// Creates a transport with its own pooled client
	pub fn new(version: JsonRpcVersion, retry: &RetryConfig) -> Result<Self, anyhow::Error> {
		let client = create_node_http_client(retry)?;
		Ok(Self::with_client(client, version))
	}

	/// Creates a transport around an existing client
	pub fn with_client(client: ClientWithMiddleware, version: JsonRpcVersion) -> Self {
		Self { client, version }
	}
}

fn request_metadata(node: &Node, method: &str) -> Option<HashMap<String, String>> {
	Some(HashMap::from([
		("node".to_string(), node.name.clone()),
		("method".to_string(), method.to_string()),
	]))
}

/// Extracts `{code, message}` from a JSON-RPC error member, if one is set
fn rpc_error(body: &Value) -> Option<(i64, String)> {
	let error = body.get("error")?;
	if error.is_null() {
		return None;
	}
	let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
	let message = error
		.get("message")
		.and_then(Value::as_str)
		.map(str::to_string)
		.unwrap_or_else(|| error.to_string());
	Some((code, message))
}

#[async_trait]
impl NodeTransport for HttpTransportClient {
	fn version(&self) -> JsonRpcVersion {
		self.version
	}

	async fn send_raw_request(
		&self,
		node: &Node,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, TransportError> {
		let body = self.customize_request(&id, method, params);

		let mut request = self.client.post(node.rpc_url.as_str()).json(&body);
		if let Some((user, password)) = node.credentials() {
			request = request.basic_auth(user, Some(password));
		}

		let response = request.send().await.map_err(|e| {
			TransportError::network(
				format!("Failed to send request: {}", e),
				Some(Box::new(e)),
				request_metadata(node, method),
			)
		})?;

		let status = response.status();
		let text = response.text().await.map_err(|e| {
			TransportError::network(
				format!("Failed to read response body: {}", e),
				Some(Box::new(e)),
				request_metadata(node, method),
			)
		})?;

		// Bitcoin-family nodes return HTTP 500 together with a JSON-RPC error body
		let parsed = serde_json::from_str::<Value>(&text);
		if let Ok(json) = &parsed {
			if let Some((code, message)) = rpc_error(json) {
				return Err(TransportError::rpc(
					code,
					message,
					request_metadata(node, method),
				));
			}
		}

		if !status.is_success() {
			return Err(TransportError::http(
				status,
				node.name.clone(),
				text,
				None,
				request_metadata(node, method),
			));
		}

		let json = parsed.map_err(|e| {
			TransportError::response_parse(
				format!("Failed to parse response: {}", e),
				Some(Box::new(e)),
				request_metadata(node, method),
			)
		})?;

		Ok(json.get("result").cloned().unwrap_or(Value::Null))
	}
}
