use async_trait::async_trait;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};

use chain_gateway::{
	models::Node,
	services::blockchain::{
		BitcoinClient, ChainAdapter, ElectedNode, EthereumClient, JsonRpcVersion, NodeTransport,
		TransportError,
	},
	utils::{parse_hex_quantity, tests::NodeBuilder, to_hex_quantity},
};
use proptest::{prelude::*, test_runner::Config};

const MAX_TIP: u64 = 40;

/// Linked chain `0..=tip`, optionally with one block missing
struct LinkedChain {
	version: JsonRpcVersion,
	blocks: HashMap<String, Value>,
	heights: HashMap<u64, String>,
}

impl LinkedChain {
	fn new(version: JsonRpcVersion, tip: u64, missing: Option<u64>) -> Self {
		let hash = |height: u64| match version {
			JsonRpcVersion::V1 => format!("{:064x}", height + 1),
			JsonRpcVersion::V2 => format!("0x{:064x}", height + 1),
		};

		let mut blocks = HashMap::new();
		let mut heights = HashMap::new();
		for height in 0..=tip {
			heights.insert(height, hash(height));
			if Some(height) == missing {
				continue;
			}
			let block = match version {
				JsonRpcVersion::V1 => json!({
					"hash": hash(height),
					"height": height,
					"nextblockhash": (height < tip).then(|| hash(height + 1)),
				}),
				JsonRpcVersion::V2 => json!({
					"hash": hash(height),
					"number": to_hex_quantity(height),
					"parentHash": if height == 0 { format!("0x{:064x}", 0) } else { hash(height - 1) },
				}),
			};
			blocks.insert(hash(height), block);
		}

		Self {
			version,
			blocks,
			heights,
		}
	}

	fn block(&self, hash: Option<&str>) -> Option<Value> {
		hash.and_then(|hash| self.blocks.get(hash)).cloned()
	}
}

#[async_trait]
impl NodeTransport for LinkedChain {
	fn version(&self) -> JsonRpcVersion {
		self.version
	}

	async fn send_raw_request(
		&self,
		_node: &Node,
		_id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, TransportError> {
		let not_found = || TransportError::rpc(-5, "Block not found", None);
		match method {
			"getblockhash" => params[0]
				.as_u64()
				.and_then(|height| self.heights.get(&height))
				.map(|hash| json!(hash))
				.ok_or_else(not_found),
			"getblock" => self.block(params[0].as_str()).ok_or_else(not_found),
			"eth_getBlockByNumber" => Ok(params[0]
				.as_str()
				.and_then(parse_hex_quantity)
				.and_then(|height| self.heights.get(&height))
				.and_then(|hash| self.block(Some(hash)))
				.unwrap_or(Value::Null)),
			"eth_getBlockByHash" => Ok(self.block(params[0].as_str()).unwrap_or(Value::Null)),
			_ => Err(TransportError::rpc(-32601, "Method not found", None)),
		}
	}
}

fn elected() -> ElectedNode {
	ElectedNode::fixed(Some(NodeBuilder::new().name("node-1").build()))
}

async fn range(
	version: JsonRpcVersion,
	tip: u64,
	missing: Option<u64>,
	from: u64,
	to: u64,
) -> Option<Vec<u64>> {
	let chain = Arc::new(LinkedChain::new(version, tip, missing));
	match version {
		JsonRpcVersion::V1 => {
			let client = BitcoinClient::new_with_transport(chain, elected(), "BITCOIN", false);
			let blocks = client.get_block_range_by_number(from, to, None).await.ok()?;
			Some(blocks.iter().filter_map(|b| client.block_number(b)).collect())
		}
		JsonRpcVersion::V2 => {
			let client = EthereumClient::new_with_transport(chain, elected(), "ETHEREUM");
			let blocks = client.get_block_range_by_number(from, to, None).await.ok()?;
			Some(blocks.iter().filter_map(|b| client.block_number(b)).collect())
		}
	}
}

fn bounds_strategy() -> impl Strategy<Value = (u64, u64, u64)> {
	(1..MAX_TIP).prop_flat_map(|tip| {
		(0..=tip).prop_flat_map(move |from| (Just(tip), Just(from), from..=tip))
	})
}

fn version_strategy() -> impl Strategy<Value = JsonRpcVersion> {
	prop_oneof![Just(JsonRpcVersion::V1), Just(JsonRpcVersion::V2)]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
	tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.unwrap()
		.block_on(future)
}

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		cases: 64,
		..Config::default()
	})]

	#[test]
	fn test_range_is_contiguous_and_ascending(
		version in version_strategy(),
		(tip, from, to) in bounds_strategy(),
	) {
		let heights = block_on(range(version, tip, None, from, to));
		prop_assert_eq!(heights, Some((from..=to).collect::<Vec<_>>()));
	}

	#[test]
	fn test_range_fails_closed_on_missing_link(
		version in version_strategy(),
		(tip, from, to) in bounds_strategy(),
		offset in any::<prop::sample::Index>(),
	) {
		let missing = from + offset.index((to - from + 1) as usize) as u64;
		let heights = block_on(range(version, tip, Some(missing), from, to));
		prop_assert_eq!(heights, None);
	}

	#[test]
	fn test_inverted_range_is_rejected(
		version in version_strategy(),
		(tip, from, to) in bounds_strategy(),
	) {
		prop_assume!(from < to);
		let heights = block_on(range(version, tip, None, to, from));
		prop_assert_eq!(heights, None);
	}
}
