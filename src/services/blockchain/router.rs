//! Routes JSON-RPC requests to the elected node.
//!
//! Internal calls swallow failures into an absent result. User-facing calls
//! keep them as structured errors.

use serde_json::Value;
use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};
use tracing::debug;

use crate::{
	models::Node,
	services::blockchain::{
		transports::{NodeTransport, TransportError},
		BlockChainError, ElectedNode,
	},
};

/// Shared request routing used by every chain adapter
pub struct NodeRouter<T> {
	transport: Arc<T>,
	elected: ElectedNode,
	blockchain: String,
	next_id: AtomicU64,
}

impl<T: NodeTransport> NodeRouter<T> {
	pub fn new(transport: Arc<T>, elected: ElectedNode, blockchain: impl Into<String>) -> Self {
		Self {
			transport,
			elected,
			blockchain: blockchain.into(),
			next_id: AtomicU64::new(1),
		}
	}

	pub fn elected(&self) -> &ElectedNode {
		&self.elected
	}

	pub fn blockchain(&self) -> &str {
		&self.blockchain
	}

	fn metadata(&self, node: &Node, method: &str) -> Option<HashMap<String, String>> {
		Some(HashMap::from([
			("blockchain".to_string(), self.blockchain.clone()),
			("node".to_string(), node.name.clone()),
			("method".to_string(), method.to_string()),
		]))
	}

	/// Sends one request to `node`, mapping transport failures to adapter errors
	pub async fn request(
		&self,
		node: &Node,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		self.transport
			.send_raw_request(node, id, method, params)
			.await
			.map_err(|e| match e {
				TransportError::Rpc { code, message, .. } => {
					BlockChainError::node_error(code, message, self.metadata(node, method))
				}
				other => BlockChainError::connection_error(
					format!("Request to node {} failed", node.name),
					Some(Box::new(other)),
					self.metadata(node, method),
				),
			})
	}

	fn internal_id(&self) -> Value {
		Value::from(self.next_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Internal call to an explicit node. Failures and `null` results are absent.
	pub async fn call_node(&self, node: &Node, method: &str, params: Value) -> Option<Value> {
		match self.request(node, self.internal_id(), method, params).await {
			Ok(Value::Null) => None,
			Ok(value) => Some(value),
			Err(e) => {
				debug!(
					node = %node.name,
					method = %method,
					error = %e,
					"Internal call returned no result"
				);
				None
			}
		}
	}

	/// Internal call to the elected node
	pub async fn call(&self, method: &str, params: Value) -> Option<Value> {
		let node = self.elected.current()?;
		self.call_node(&node, method, params).await
	}

	/// User-facing call to the elected node
	pub async fn user_call(
		&self,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		let node = self.elected.current().ok_or_else(|| {
			BlockChainError::no_elected_node(
				format!("no node elected for {}", self.blockchain),
				Some(HashMap::from([(
					"method".to_string(),
					method.to_string(),
				)])),
			)
		})?;
		self.request(&node, id, method, params).await
	}
}
