use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};
use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use chain_gateway::{
	models::Node,
	services::blockchain::{JsonRpcVersion, NodeTransport, TransportError},
	utils::{parse_hex_quantity, to_hex_quantity},
};

// Mock implementation of a node transport.
// Used to script single JSON-RPC exchanges and check the requests sent.
mock! {
	pub NodeTransport {}

	#[async_trait]
	impl NodeTransport for NodeTransport {
		fn version(&self) -> JsonRpcVersion;

		async fn send_raw_request(
			&self,
			node: &Node,
			id: Value,
			method: &str,
			params: Value,
		) -> Result<Value, TransportError>;
	}
}

/// Hash used for the block at `height` on the in-memory chains
pub fn bitcoin_hash(height: u64) -> String {
	format!("{:064x}", height + 0xb00)
}

pub fn ethereum_hash(height: u64) -> String {
	format!("0x{:064x}", height + 0xe00)
}

#[derive(Default)]
struct ChainState {
	/// Blocks by hash
	blocks: HashMap<String, Value>,
	/// Canonical hash by height
	heights: HashMap<u64, String>,
	transactions: HashMap<String, Value>,
	tip: u64,
	calls: Vec<String>,
	/// Nodes that refuse every request
	offline: Vec<String>,
}

/// A node pool serving one in-memory chain.
///
/// Answers the Bitcoin-family methods for [`JsonRpcVersion::V1`] and the
/// Ethereum methods for [`JsonRpcVersion::V2`]. Every node sees the same chain
/// unless it is taken offline.
#[derive(Clone)]
pub struct InMemoryChainTransport {
	version: JsonRpcVersion,
	state: Arc<Mutex<ChainState>>,
}

impl InMemoryChainTransport {
	/// Chain with blocks `0..=tip`
	pub fn bitcoin(tip: u64) -> Self {
		let transport = Self {
			version: JsonRpcVersion::V1,
			state: Arc::new(Mutex::new(ChainState::default())),
		};
		for height in 0..=tip {
			transport.push_block(height);
		}
		transport
	}

	pub fn ethereum(tip: u64) -> Self {
		let transport = Self {
			version: JsonRpcVersion::V2,
			state: Arc::new(Mutex::new(ChainState::default())),
		};
		for height in 0..=tip {
			transport.push_block(height);
		}
		transport
	}

	fn hash(&self, height: u64) -> String {
		match self.version {
			JsonRpcVersion::V1 => bitcoin_hash(height),
			JsonRpcVersion::V2 => ethereum_hash(height),
		}
	}

	/// Appends the block at `height` to the canonical chain
	pub fn push_block(&self, height: u64) {
		let hash = self.hash(height);
		let block = match self.version {
			JsonRpcVersion::V1 => {
				let mut block = json!({
					"hash": hash,
					"height": height,
					"confirmations": 1,
					"tx": [format!("tx-{}", height)],
				});
				if height > 0 {
					block["previousblockhash"] = json!(self.hash(height - 1));
				}
				block
			}
			JsonRpcVersion::V2 => {
				let parent = if height > 0 {
					self.hash(height - 1)
				} else {
					format!("0x{:064x}", 0)
				};
				json!({
					"hash": hash,
					"number": to_hex_quantity(height),
					"parentHash": parent,
					"transactions": [],
				})
			}
		};

		let mut state = self.state.lock().unwrap();
		if self.version == JsonRpcVersion::V1 && height > 0 {
			let previous = self.hash(height - 1);
			if let Some(previous) = state.blocks.get_mut(&previous) {
				previous["nextblockhash"] = json!(hash);
			}
		}
		state.blocks.insert(hash.clone(), block);
		state.heights.insert(height, hash);
		state.tip = state.tip.max(height);
	}

	/// Makes the block at `height` unknown to every node
	pub fn remove_block(&self, height: u64) {
		let hash = self.hash(height);
		let mut state = self.state.lock().unwrap();
		state.blocks.remove(&hash);
	}

	pub fn add_transaction(&self, hash: &str, payload: Value) {
		self.state
			.lock()
			.unwrap()
			.transactions
			.insert(hash.to_string(), payload);
	}

	pub fn set_offline(&self, node_name: &str) {
		self.state
			.lock()
			.unwrap()
			.offline
			.push(node_name.to_string());
	}

	/// Methods received so far, in order
	pub fn calls(&self) -> Vec<String> {
		self.state.lock().unwrap().calls.clone()
	}

	pub fn call_count(&self, method: &str) -> usize {
		self.calls().iter().filter(|m| m.as_str() == method).count()
	}

	fn block_or_error(state: &ChainState, hash: &str) -> Result<Value, TransportError> {
		state
			.blocks
			.get(hash)
			.cloned()
			.ok_or_else(|| TransportError::rpc(-5, "Block not found", None))
	}

	fn answer_v1(state: &ChainState, method: &str, params: &Value) -> Result<Value, TransportError> {
		match method {
			"getblockcount" => Ok(json!(state.tip)),
			"getbestblockhash" => Ok(json!(state.heights[&state.tip])),
			"getblockhash" => {
				let height = params[0].as_u64().unwrap_or(u64::MAX);
				state
					.heights
					.get(&height)
					.map(|hash| json!(hash))
					.ok_or_else(|| TransportError::rpc(-8, "Block height out of range", None))
			}
			"getblock" => Self::block_or_error(state, params[0].as_str().unwrap_or_default()),
			"getrawtransaction" => state
				.transactions
				.get(params[0].as_str().unwrap_or_default())
				.cloned()
				.ok_or_else(|| {
					TransportError::rpc(-5, "No such mempool or blockchain transaction", None)
				}),
			"getblockchaininfo" => Ok(json!({
				"blocks": state.tip,
				"initialblockdownload": false,
				"warnings": "",
			})),
			"getpeerinfo" => Ok(json!([{"id": 0}, {"id": 1}])),
			_ => Err(TransportError::rpc(-32601, "Method not found", None)),
		}
	}

	fn answer_v2(state: &ChainState, method: &str, params: &Value) -> Result<Value, TransportError> {
		match method {
			"eth_blockNumber" => Ok(json!(to_hex_quantity(state.tip))),
			"eth_syncing" => Ok(json!(false)),
			"net_peerCount" => Ok(json!("0x3")),
			"eth_getBlockByNumber" => {
				let height = match params[0].as_str() {
					Some("latest") => Some(state.tip),
					Some(quantity) => parse_hex_quantity(quantity),
					None => None,
				};
				Ok(height
					.and_then(|height| state.heights.get(&height))
					.and_then(|hash| state.blocks.get(hash))
					.cloned()
					.unwrap_or(Value::Null))
			}
			"eth_getBlockByHash" => Ok(state
				.blocks
				.get(params[0].as_str().unwrap_or_default())
				.cloned()
				.unwrap_or(Value::Null)),
			"eth_getTransactionByHash" => Ok(state
				.transactions
				.get(params[0].as_str().unwrap_or_default())
				.cloned()
				.unwrap_or(Value::Null)),
			_ => Err(TransportError::rpc(-32601, "Method not found", None)),
		}
	}
}

#[async_trait]
impl NodeTransport for InMemoryChainTransport {
	fn version(&self) -> JsonRpcVersion {
		self.version
	}

	async fn send_raw_request(
		&self,
		node: &Node,
		_id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, TransportError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push(method.to_string());
		if state.offline.contains(&node.name) {
			return Err(TransportError::network(
				format!("node {} is offline", node.name),
				None,
				None,
			));
		}
		match self.version {
			JsonRpcVersion::V1 => Self::answer_v1(&state, method, &params),
			JsonRpcVersion::V2 => Self::answer_v2(&state, method, &params),
		}
	}
}
