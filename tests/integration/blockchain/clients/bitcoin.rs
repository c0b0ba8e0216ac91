use serde_json::{json, Value};
use std::sync::Arc;

use chain_gateway::{
	models::{BlocksFilter, ChainFamily, NodeInfo},
	services::blockchain::{BitcoinClient, BlockChainError, ChainAdapter, ElectedNode, JsonRpcVersion},
	utils::tests::NodeBuilder,
};

use crate::integration::mocks::{bitcoin_hash, InMemoryChainTransport, MockNodeTransport};

fn client_for(chain: &InMemoryChainTransport) -> BitcoinClient<InMemoryChainTransport> {
	BitcoinClient::new_with_transport(
		Arc::new(chain.clone()),
		ElectedNode::fixed(Some(NodeBuilder::new().name("btc-1").build())),
		"BITCOIN",
		false,
	)
}

fn heights(blocks: &[Value]) -> Vec<u64> {
	blocks
		.iter()
		.map(|block| block["height"].as_u64().unwrap())
		.collect()
}

#[tokio::test]
async fn test_family_and_gap_tracking() {
	let client = client_for(&InMemoryChainTransport::bitcoin(1));
	assert_eq!(client.family(), ChainFamily::Bitcoin);
	assert_eq!(client.blockchain(), "BITCOIN");
	assert!(!client.tracks_block_gaps());
	assert_eq!(client.block_number(&json!({"height": 7})), Some(7));
}

#[tokio::test]
async fn test_get_block_by_number_and_hash() {
	let chain = InMemoryChainTransport::bitcoin(5);
	let client = client_for(&chain);

	let block = client.get_block_by_number(3, None).await.unwrap();
	assert_eq!(block["hash"], json!(bitcoin_hash(3)));

	let block = client.get_block_by_hash(&bitcoin_hash(4), None).await.unwrap();
	assert_eq!(block["height"], json!(4));

	assert!(client.get_block_by_hash("ff", None).await.is_none());
	assert!(client.get_block_by_number(42, None).await.is_none());

	let current = client.get_current_block(None).await.unwrap();
	assert_eq!(current["height"], json!(5));
}

#[tokio::test]
async fn test_getblock_verbosity_argument() {
	let node = NodeBuilder::new().build();
	let mut transport = MockNodeTransport::new();
	transport.expect_version().return_const(JsonRpcVersion::V1);
	transport
		.expect_send_raw_request()
		.withf(|_, _, method, params| method == "getblock" && *params == json!(["aa", 2]))
		.times(1)
		.returning(|_, _, _, _| Ok(json!({"hash": "aa"})));
	transport
		.expect_send_raw_request()
		.withf(|_, _, method, params| method == "getblock" && *params == json!(["aa", 0]))
		.times(1)
		.returning(|_, _, _, _| Ok(json!("00ff")));

	let client = BitcoinClient::new_with_transport(
		Arc::new(transport),
		ElectedNode::fixed(Some(node)),
		"BITCOIN",
		false,
	);
	assert_eq!(client.get_block_by_hash("aa", None).await, Some(json!({"hash": "aa"})));
	assert_eq!(client.get_block_by_hash("aa", Some(0)).await, Some(json!("00ff")));
}

#[tokio::test]
async fn test_hash_only_getblock_omits_verbosity() {
	let mut transport = MockNodeTransport::new();
	transport.expect_version().return_const(JsonRpcVersion::V1);
	transport
		.expect_send_raw_request()
		.withf(|_, _, method, params| method == "getblock" && *params == json!(["aa"]))
		.times(1)
		.returning(|_, _, _, _| Ok(json!({"hash": "aa"})));

	let client = BitcoinClient::new_with_transport(
		Arc::new(transport),
		ElectedNode::fixed(Some(NodeBuilder::new().build())),
		"DOGECOIN",
		true,
	);
	assert!(client.get_block_by_hash("aa", Some(2)).await.is_some());
}

#[tokio::test]
async fn test_block_range_by_number_is_contiguous() {
	let chain = InMemoryChainTransport::bitcoin(10);
	let client = client_for(&chain);

	let blocks = client.get_block_range_by_number(3, 7, None).await.unwrap();
	assert_eq!(heights(&blocks), vec![3, 4, 5, 6, 7]);

	let single = client.get_block_range_by_number(4, 4, None).await.unwrap();
	assert_eq!(heights(&single), vec![4]);
}

#[tokio::test]
async fn test_block_range_by_number_rejects_inverted_range() {
	let client = client_for(&InMemoryChainTransport::bitcoin(10));
	let result = client.get_block_range_by_number(7, 3, None).await;
	assert!(matches!(result, Err(BlockChainError::RequestError(_))));
}

#[tokio::test]
async fn test_wide_block_range_fails_at_chain_tip() {
	let client = client_for(&InMemoryChainTransport::bitcoin(1));

	let result = client
		.get_blocks(&BlocksFilter::by_number_range(1, u64::MAX / 2), None)
		.await;
	assert!(matches!(result, Err(BlockChainError::BlockNotFound(_))));

	let result = client.get_block_range_by_number(0, u64::MAX, None).await;
	assert!(matches!(result, Err(BlockChainError::BlockNotFound(_))));
}

#[tokio::test]
async fn test_block_range_fails_on_missing_link() {
	let chain = InMemoryChainTransport::bitcoin(10);
	chain.remove_block(5);
	let client = client_for(&chain);

	let result = client.get_block_range_by_number(3, 7, None).await;
	assert!(matches!(result, Err(BlockChainError::BlockNotFound(_))));

	let result = client
		.get_block_range_by_hash(&bitcoin_hash(3), &bitcoin_hash(7), None)
		.await;
	assert!(matches!(result, Err(BlockChainError::BlockNotFound(_))));
}

#[tokio::test]
async fn test_block_range_by_hash() {
	let chain = InMemoryChainTransport::bitcoin(10);
	let client = client_for(&chain);

	let blocks = client
		.get_block_range_by_hash(&bitcoin_hash(2), &bitcoin_hash(6), None)
		.await
		.unwrap();
	assert_eq!(heights(&blocks), vec![2, 3, 4, 5, 6]);

	// `to` below `from` can never be reached walking forward
	let result = client
		.get_block_range_by_hash(&bitcoin_hash(6), &bitcoin_hash(2), None)
		.await;
	assert!(matches!(result, Err(BlockChainError::RequestError(_))));
}

#[tokio::test]
async fn test_get_blocks_keeps_positions_for_explicit_lists() {
	let chain = InMemoryChainTransport::bitcoin(5);
	let client = client_for(&chain);

	let blocks = client
		.get_blocks(&BlocksFilter::by_numbers(vec![1, 99, 3]), None)
		.await
		.unwrap();
	assert_eq!(blocks.len(), 3);
	assert_eq!(blocks[0].as_ref().unwrap()["height"], json!(1));
	assert!(blocks[1].is_none());
	assert_eq!(blocks[2].as_ref().unwrap()["height"], json!(3));

	let blocks = client
		.get_blocks(&BlocksFilter::by_number_range(2, 4), None)
		.await
		.unwrap();
	assert_eq!(blocks.len(), 3);
	assert!(blocks.iter().all(Option::is_some));
}

#[tokio::test]
async fn test_get_txs_by_hash_keeps_positions() {
	let chain = InMemoryChainTransport::bitcoin(1);
	chain.add_transaction("t1", json!({"txid": "t1"}));
	chain.add_transaction("t3", json!({"txid": "t3"}));
	let client = client_for(&chain);

	let txs = client
		.get_txs_by_hash(&["t1".to_string(), "t2".to_string(), "t3".to_string()])
		.await;
	assert_eq!(txs, vec![Some(json!({"txid": "t1"})), None, Some(json!({"txid": "t3"}))]);
	assert_eq!(chain.call_count("getrawtransaction"), 3);
}

#[tokio::test]
async fn test_probe_and_info() {
	let chain = InMemoryChainTransport::bitcoin(8);
	let client = client_for(&chain);

	let status = client.probe(&NodeBuilder::new().name("btc-2").build()).await.unwrap();
	assert_eq!(status.height, 8);
	assert!(status.is_eligible());

	assert_eq!(
		client.get_info().await.unwrap(),
		NodeInfo {
			block_count: 8,
			peer_count: 2,
		}
	);
	assert_eq!(client.get_block_count().await, Some(8));
}

#[tokio::test]
async fn test_probe_of_offline_node_fails() {
	let chain = InMemoryChainTransport::bitcoin(8);
	chain.set_offline("btc-2");
	let client = client_for(&chain);

	let result = client.probe(&NodeBuilder::new().name("btc-2").build()).await;
	assert!(matches!(result, Err(BlockChainError::ConnectionError(_))));
}
