//! Ethereum client.
//!
//! Talks JSON-RPC 2.0 over HTTP and subscribes to new heads and pending
//! transactions over WebSocket.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;

use crate::{
	models::{ChainFamily, GatewayConfig, Node, NodeInfo, SyncStatus},
	services::blockchain::{
		notifications::{subscribe_websocket, NotificationStream},
		router::NodeRouter,
		transports::{HttpTransportClient, JsonRpcVersion, NodeTransport},
		BlockChainError, ChainAdapter, ElectedNode,
	},
	utils::{parse_hex_quantity, to_hex_quantity},
};

/// Client for Ethereum nodes
pub struct EthereumClient<T> {
	router: NodeRouter<T>,
}

/// Any verbosity above zero asks for full transaction objects
fn full_transactions(verbosity: Option<u8>) -> bool {
	verbosity.map(|v| v > 0).unwrap_or(true)
}

fn hex_field(value: &Value, field: &str) -> Option<u64> {
	value.get(field).and_then(Value::as_str).and_then(parse_hex_quantity)
}

impl<T: NodeTransport + 'static> EthereumClient<T> {
	/// Creates a client with a specific transport
	pub fn new_with_transport(
		transport: Arc<T>,
		elected: ElectedNode,
		blockchain: impl Into<String>,
	) -> Self {
		Self {
			router: NodeRouter::new(transport, elected, blockchain),
		}
	}

	fn range_metadata(&self, from: String, to: String) -> Option<HashMap<String, String>> {
		Some(HashMap::from([
			("blockchain".to_string(), self.router.blockchain().to_string()),
			("from".to_string(), from),
			("to".to_string(), to),
		]))
	}

	/// Walks `parentHash` links down from `last` until height `floor`.
	///
	/// `accept` decides whether the block at `floor` is the expected one. The
	/// result is in ascending order.
	async fn walk_back(
		&self,
		last: Value,
		floor: u64,
		verbosity: Option<u8>,
		accept: impl Fn(&Value) -> bool + Send,
		metadata: impl Fn() -> Option<HashMap<String, String>> + Send,
	) -> Result<Vec<Value>, BlockChainError> {
		let mut blocks = Vec::new();
		let mut current = last;

		loop {
			let number = hex_field(&current, "number").ok_or_else(|| {
				BlockChainError::request_error("block payload has no number", None, metadata())
			})?;

			if number <= floor {
				if number < floor || !accept(&current) {
					return Err(BlockChainError::request_error(
						"range end does not descend from range start",
						None,
						metadata(),
					));
				}
				blocks.push(current);
				blocks.reverse();
				return Ok(blocks);
			}

			let parent = current
				.get("parentHash")
				.and_then(Value::as_str)
				.map(str::to_string)
				.ok_or_else(|| {
					BlockChainError::request_error(
						format!("block {} has no parent hash", number),
						None,
						metadata(),
					)
				})?;
			blocks.push(current);

			current = self
				.get_block_by_hash(&parent, verbosity)
				.await
				.ok_or_else(|| {
					BlockChainError::block_not_found(
						format!("block {} not found", parent),
						None,
						metadata(),
					)
				})?;
		}
	}
}

impl EthereumClient<HttpTransportClient> {
	/// Creates a client over JSON-RPC 2.0 HTTP
	pub fn new(config: &GatewayConfig, elected: ElectedNode) -> Result<Self, anyhow::Error> {
		let transport = HttpTransportClient::new(JsonRpcVersion::V2, &config.rpc_retry)?;
		Ok(Self::new_with_transport(
			Arc::new(transport),
			elected,
			config.blockchain.clone(),
		))
	}
}

#[async_trait]
impl<T: NodeTransport + 'static> ChainAdapter for EthereumClient<T> {
	fn family(&self) -> ChainFamily {
		ChainFamily::Ethereum
	}

	fn blockchain(&self) -> String {
		self.router.blockchain().to_string()
	}

	fn elected_node(&self) -> ElectedNode {
		self.router.elected().clone()
	}

	async fn call(&self, method: &str, params: Value) -> Option<Value> {
		self.router.call(method, params).await
	}

	async fn call_node(&self, node: &Node, method: &str, params: Value) -> Option<Value> {
		self.router.call_node(node, method, params).await
	}

	/// Height from `eth_blockNumber`; any `eth_syncing` answer other than
	/// `false` counts as still syncing.
	#[instrument(skip(self, node), fields(node = %node.name))]
	async fn probe(&self, node: &Node) -> Result<SyncStatus, BlockChainError> {
		let number = self
			.router
			.request(node, json!("probe"), "eth_blockNumber", json!([]))
			.await?;
		let height = number
			.as_str()
			.and_then(parse_hex_quantity)
			.ok_or_else(|| {
				BlockChainError::request_error(
					format!("invalid eth_blockNumber response: {}", number),
					None,
					None,
				)
			})?;

		let syncing = self
			.router
			.request(node, json!("probe"), "eth_syncing", json!([]))
			.await?;

		Ok(SyncStatus {
			height,
			initial_sync: syncing != Value::Bool(false),
			warnings: None,
		})
	}

	#[instrument(skip(self))]
	async fn get_info(&self) -> Result<NodeInfo, BlockChainError> {
		let block_count = self.get_block_count().await;
		let peer_count = self
			.call("net_peerCount", json!([]))
			.await
			.as_ref()
			.and_then(Value::as_str)
			.and_then(parse_hex_quantity);

		match (block_count, peer_count) {
			(Some(block_count), Some(peer_count)) => Ok(NodeInfo {
				block_count,
				peer_count,
			}),
			_ => Err(BlockChainError::connection_error(
				"Failed to get node info",
				None,
				Some(HashMap::from([(
					"blockchain".to_string(),
					self.router.blockchain().to_string(),
				)])),
			)),
		}
	}

	#[instrument(skip(self, params))]
	async fn rpc_call(
		&self,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		self.router.user_call(id, method, params).await
	}

	#[instrument(skip(self, raw_tx))]
	async fn send_signed_transaction(&self, raw_tx: &str) -> Result<Value, BlockChainError> {
		self.router
			.user_call(
				json!("eth_sendRawTransaction"),
				"eth_sendRawTransaction",
				json!([raw_tx]),
			)
			.await
	}

	async fn get_current_block(&self, verbosity: Option<u8>) -> Option<Value> {
		let number = self.get_block_count().await?;
		self.get_block_by_number(number, verbosity).await
	}

	#[instrument(skip(self))]
	async fn get_block_by_number(&self, number: u64, verbosity: Option<u8>) -> Option<Value> {
		self.call(
			"eth_getBlockByNumber",
			json!([to_hex_quantity(number), full_transactions(verbosity)]),
		)
		.await
	}

	#[instrument(skip(self))]
	async fn get_block_by_hash(&self, hash: &str, verbosity: Option<u8>) -> Option<Value> {
		self.call(
			"eth_getBlockByHash",
			json!([hash, full_transactions(verbosity)]),
		)
		.await
	}

	/// Walks `parentHash` back from `to` until the block at the height of `from`
	#[instrument(skip(self))]
	async fn get_block_range_by_hash(
		&self,
		from: &str,
		to: &str,
		verbosity: Option<u8>,
	) -> Result<Vec<Value>, BlockChainError> {
		let metadata = || self.range_metadata(from.to_string(), to.to_string());

		let first = self.get_block_by_hash(from, verbosity).await.ok_or_else(|| {
			BlockChainError::block_not_found(format!("block {} not found", from), None, metadata())
		})?;
		let floor = self.block_number(&first).ok_or_else(|| {
			BlockChainError::request_error("block payload has no number", None, metadata())
		})?;

		let last = self.get_block_by_hash(to, verbosity).await.ok_or_else(|| {
			BlockChainError::block_not_found(format!("block {} not found", to), None, metadata())
		})?;

		let from_hash = from.to_lowercase();
		self.walk_back(
			last,
			floor,
			verbosity,
			move |block| {
				block
					.get("hash")
					.and_then(Value::as_str)
					.map(|hash| hash.to_lowercase() == from_hash)
					.unwrap_or(false)
			},
			metadata,
		)
		.await
	}

	#[instrument(skip(self))]
	async fn get_block_range_by_number(
		&self,
		from: u64,
		to: u64,
		verbosity: Option<u8>,
	) -> Result<Vec<Value>, BlockChainError> {
		let metadata = || self.range_metadata(from.to_string(), to.to_string());
		if from > to {
			return Err(BlockChainError::request_error(
				"range start is above range end",
				None,
				metadata(),
			));
		}

		let last = self.get_block_by_number(to, verbosity).await.ok_or_else(|| {
			BlockChainError::block_not_found(format!("block {} not found", to), None, metadata())
		})?;

		self.walk_back(last, from, verbosity, |_| true, metadata).await
	}

	async fn get_txs_by_hash(&self, hashes: &[String]) -> Vec<Option<Value>> {
		let lookups = hashes
			.iter()
			.map(|hash| self.call("eth_getTransactionByHash", json!([hash])));
		futures::future::join_all(lookups).await
	}

	async fn get_block_count(&self) -> Option<u64> {
		let number = self.call("eth_blockNumber", json!([])).await?;
		parse_hex_quantity(number.as_str()?)
	}

	async fn subscribe(&self, node: &Node) -> Result<NotificationStream, BlockChainError> {
		subscribe_websocket(&node.notification_url).await
	}

	fn block_number(&self, block: &Value) -> Option<u64> {
		hex_field(block, "number")
	}

	fn tracks_block_gaps(&self) -> bool {
		true
	}
}
