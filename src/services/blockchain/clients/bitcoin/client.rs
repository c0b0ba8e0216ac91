//! Bitcoin-family client (Bitcoin, Litecoin, Dogecoin, Dash, ...).
//!
//! Talks JSON-RPC 1.0 over HTTP with basic auth and subscribes to block and
//! transaction hashes over ZeroMQ.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tracing::instrument;

use crate::{
	models::{ChainFamily, GatewayConfig, Node, NodeInfo, SyncStatus},
	services::blockchain::{
		adapter::DEFAULT_VERBOSITY,
		notifications::{subscribe_zmq, NotificationStream},
		router::NodeRouter,
		transports::{HttpTransportClient, JsonRpcVersion, NodeTransport},
		BlockChainError, ChainAdapter, ElectedNode,
	},
};

/// Client for Bitcoin-family nodes
pub struct BitcoinClient<T> {
	router: NodeRouter<T>,
	/// `getblock` takes only the hash on some forks
	hash_only_getblock: bool,
}

impl<T: NodeTransport> BitcoinClient<T> {
	/// Creates a client with a specific transport
	pub fn new_with_transport(
		transport: Arc<T>,
		elected: ElectedNode,
		blockchain: impl Into<String>,
		hash_only_getblock: bool,
	) -> Self {
		Self {
			router: NodeRouter::new(transport, elected, blockchain),
			hash_only_getblock,
		}
	}

	fn getblock_params(&self, hash: &str, verbosity: Option<u8>) -> Value {
		if self.hash_only_getblock {
			json!([hash])
		} else {
			json!([hash, verbosity.unwrap_or(DEFAULT_VERBOSITY)])
		}
	}

	fn range_metadata(&self, from: String, to: String) -> Option<HashMap<String, String>> {
		Some(HashMap::from([
			("blockchain".to_string(), self.router.blockchain().to_string()),
			("from".to_string(), from),
			("to".to_string(), to),
		]))
	}

	fn next_hash(block: &Value) -> Option<&str> {
		block.get("nextblockhash").and_then(Value::as_str)
	}

	fn block_hash(block: &Value) -> Option<&str> {
		block.get("hash").and_then(Value::as_str)
	}
}

impl BitcoinClient<HttpTransportClient> {
	/// Creates a client over JSON-RPC 1.0 HTTP
	pub fn new(config: &GatewayConfig, elected: ElectedNode) -> Result<Self, anyhow::Error> {
		let transport = HttpTransportClient::new(JsonRpcVersion::V1, &config.rpc_retry)?;
		Ok(Self::new_with_transport(
			Arc::new(transport),
			elected,
			config.blockchain.clone(),
			config.hash_only_getblock(),
		))
	}
}

/// `warnings` is a string on older nodes and an array of strings on newer ones
fn parse_warnings(value: Option<&Value>) -> Option<String> {
	match value? {
		Value::String(warnings) => Some(warnings.clone()),
		Value::Array(items) => Some(
			items
				.iter()
				.filter_map(Value::as_str)
				.collect::<Vec<_>>()
				.join("; "),
		),
		_ => None,
	}
}

#[async_trait]
impl<T: NodeTransport + 'static> ChainAdapter for BitcoinClient<T> {
	fn family(&self) -> ChainFamily {
		ChainFamily::Bitcoin
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

	#[instrument(skip(self, node), fields(node = %node.name))]
	async fn probe(&self, node: &Node) -> Result<SyncStatus, BlockChainError> {
		let info = self
			.router
			.request(node, json!("probe"), "getblockchaininfo", json!([]))
			.await?;

		let height = info.get("blocks").and_then(Value::as_u64).ok_or_else(|| {
			BlockChainError::request_error(
				"getblockchaininfo response has no block height",
				None,
				None,
			)
		})?;

		Ok(SyncStatus {
			height,
			initial_sync: info
				.get("initialblockdownload")
				.and_then(Value::as_bool)
				.unwrap_or(false),
			warnings: parse_warnings(info.get("warnings")),
		})
	}

	#[instrument(skip(self))]
	async fn get_info(&self) -> Result<NodeInfo, BlockChainError> {
		let block_count = self.get_block_count().await;
		let peers = self.call("getpeerinfo", json!([])).await;

		match (block_count, peers.as_ref().and_then(Value::as_array)) {
			(Some(block_count), Some(peers)) => Ok(NodeInfo {
				block_count,
				peer_count: peers.len() as u64,
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
			.user_call(json!("sendrawtransaction"), "sendrawtransaction", json!([raw_tx]))
			.await
	}

	async fn get_current_block(&self, verbosity: Option<u8>) -> Option<Value> {
		let hash = self.call("getbestblockhash", json!([])).await?;
		self.get_block_by_hash(hash.as_str()?, verbosity).await
	}

	#[instrument(skip(self))]
	async fn get_block_by_number(&self, number: u64, verbosity: Option<u8>) -> Option<Value> {
		let hash = self.call("getblockhash", json!([number])).await?;
		self.get_block_by_hash(hash.as_str()?, verbosity).await
	}

	#[instrument(skip(self))]
	async fn get_block_by_hash(&self, hash: &str, verbosity: Option<u8>) -> Option<Value> {
		self.call("getblock", self.getblock_params(hash, verbosity))
			.await
	}

	/// Walks forward from `from` through `nextblockhash` until `to`.
	///
	/// The height of `to` bounds the walk, so a `to` that is not a descendant of
	/// `from` fails instead of running to the chain tip.
	#[instrument(skip(self))]
	async fn get_block_range_by_hash(
		&self,
		from: &str,
		to: &str,
		verbosity: Option<u8>,
	) -> Result<Vec<Value>, BlockChainError> {
		let metadata = || self.range_metadata(from.to_string(), to.to_string());

		let last = self.get_block_by_hash(to, verbosity).await.ok_or_else(|| {
			BlockChainError::block_not_found(format!("block {} not found", to), None, metadata())
		})?;
		let last_height = self.block_number(&last).ok_or_else(|| {
			BlockChainError::request_error("block payload has no height", None, metadata())
		})?;

		let mut current = self
			.get_block_by_hash(from, verbosity)
			.await
			.ok_or_else(|| {
				BlockChainError::block_not_found(
					format!("block {} not found", from),
					None,
					metadata(),
				)
			})?;

		let mut blocks = Vec::new();
		loop {
			let height = self.block_number(&current).unwrap_or(u64::MAX);
			if Self::block_hash(&current) == Some(to) {
				blocks.push(current);
				return Ok(blocks);
			}
			if height >= last_height {
				return Err(BlockChainError::request_error(
					format!("block {} does not follow block {}", to, from),
					None,
					metadata(),
				));
			}

			let next = Self::next_hash(&current).map(str::to_string).ok_or_else(|| {
				BlockChainError::block_not_found(
					format!("block at height {} has no successor", height),
					None,
					metadata(),
				)
			})?;
			blocks.push(current);

			current = self
				.get_block_by_hash(&next, verbosity)
				.await
				.ok_or_else(|| {
					BlockChainError::block_not_found(
						format!("block {} not found", next),
						None,
						metadata(),
					)
				})?;
		}
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

		let mut current = self
			.get_block_by_number(from, verbosity)
			.await
			.ok_or_else(|| {
				BlockChainError::block_not_found(
					format!("block {} not found", from),
					None,
					metadata(),
				)
			})?;

		let mut blocks = Vec::new();
		loop {
			let height = self.block_number(&current).ok_or_else(|| {
				BlockChainError::request_error("block payload has no height", None, metadata())
			})?;
			if height >= to {
				blocks.push(current);
				return Ok(blocks);
			}

			let next = Self::next_hash(&current).map(str::to_string).ok_or_else(|| {
				BlockChainError::block_not_found(
					format!("block at height {} has no successor", height),
					None,
					metadata(),
				)
			})?;
			blocks.push(current);

			current = self
				.get_block_by_hash(&next, verbosity)
				.await
				.ok_or_else(|| {
					BlockChainError::block_not_found(
						format!("block {} not found", next),
						None,
						metadata(),
					)
				})?;
		}
	}

	async fn get_txs_by_hash(&self, hashes: &[String]) -> Vec<Option<Value>> {
		let lookups = hashes
			.iter()
			.map(|hash| self.call("getrawtransaction", json!([hash, true])));
		futures::future::join_all(lookups).await
	}

	async fn get_block_count(&self) -> Option<u64> {
		self.call("getblockcount", json!([])).await?.as_u64()
	}

	async fn subscribe(&self, node: &Node) -> Result<NotificationStream, BlockChainError> {
		subscribe_zmq(&node.notification_url).await
	}

	fn block_number(&self, block: &Value) -> Option<u64> {
		block.get("height").and_then(Value::as_u64)
	}

	fn tracks_block_gaps(&self) -> bool {
		false
	}
}
