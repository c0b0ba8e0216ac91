use std::{collections::HashMap, sync::Arc};

use chain_gateway::{
	models::{Node, SyncStatus},
	services::{
		blockchain::{BlockChainError, ElectedNode},
		election::{NodeSelector, NodeSelectorTrait},
	},
	utils::tests::NodeBuilder,
};

use crate::integration::mocks::MockChainAdapter;

fn nodes() -> Vec<Node> {
	["n1", "n2", "n3"]
		.iter()
		.map(|name| NodeBuilder::new().name(name).host(name).build())
		.collect()
}

fn synced(height: u64) -> Result<SyncStatus, BlockChainError> {
	Ok(SyncStatus {
		height,
		initial_sync: false,
		warnings: Some(String::new()),
	})
}

/// Adapter whose probes answer from `heights`; a missing entry is unreachable
fn adapter_with(heights: HashMap<&'static str, Result<SyncStatus, ()>>) -> MockChainAdapter {
	let mut adapter = MockChainAdapter::new();
	adapter
		.expect_blockchain()
		.returning(|| "BITCOIN".to_string());
	adapter.expect_probe().returning(move |node| {
		match heights.get(node.name.as_str()) {
			Some(Ok(status)) => Ok(status.clone()),
			_ => Err(BlockChainError::connection_error(
				format!("{} unreachable", node.name),
				None,
				None,
			)),
		}
	});
	adapter
}

#[tokio::test]
async fn test_highest_synced_node_is_elected() {
	let adapter = adapter_with(HashMap::from([
		(
			"n1",
			Ok(SyncStatus {
				height: 90,
				initial_sync: true,
				warnings: None,
			}),
		),
		("n2", synced(100).map_err(|_| ())),
		("n3", synced(95).map_err(|_| ())),
	]));

	let (sender, elected) = ElectedNode::channel();
	let selector = NodeSelector::new(Arc::new(adapter), nodes(), sender, elected.clone());

	let winner = selector.select_node().await.unwrap();
	assert_eq!(winner.name, "n2");
	assert_eq!(elected.current().unwrap().name, "n2");
}

#[tokio::test]
async fn test_first_reachable_node_is_fallback() {
	let adapter = adapter_with(HashMap::from([
		(
			"n2",
			Ok(SyncStatus {
				height: 50,
				initial_sync: true,
				warnings: None,
			}),
		),
		(
			"n3",
			Ok(SyncStatus {
				height: 60,
				initial_sync: false,
				warnings: Some("Warning: We do not appear to fully agree with our peers!".into()),
			}),
		),
	]));

	let (sender, elected) = ElectedNode::channel();
	let selector = NodeSelector::new(Arc::new(adapter), nodes(), sender, elected.clone());

	assert_eq!(selector.select_node().await.unwrap().name, "n2");
}

#[tokio::test]
async fn test_no_reachable_node_keeps_current_election() {
	let adapter = adapter_with(HashMap::new());
	let (sender, elected) = ElectedNode::channel();
	sender.send_replace(Some(nodes()[2].clone()));

	let selector = NodeSelector::new(Arc::new(adapter), nodes(), sender, elected.clone());
	let mut changes = elected.subscribe();
	changes.borrow_and_update();

	assert_eq!(selector.select_node().await.unwrap().name, "n3");
	assert!(!changes.has_changed().unwrap());
}

#[tokio::test]
async fn test_same_node_is_not_rebroadcast() {
	let adapter = adapter_with(HashMap::from([
		("n1", synced(10).map_err(|_| ())),
		("n2", synced(12).map_err(|_| ())),
	]));
	let (sender, elected) = ElectedNode::channel();
	let selector = NodeSelector::new(Arc::new(adapter), nodes(), sender, elected.clone());
	let mut changes = elected.subscribe();

	selector.select_node().await;
	assert!(changes.has_changed().unwrap());
	changes.borrow_and_update();

	selector.select_node().await;
	assert!(!changes.has_changed().unwrap());
	assert_eq!(elected.current().unwrap().name, "n2");
}
