use serde_json::json;
use std::sync::Arc;

use chain_gateway::{
	models::EventKind,
	services::{
		blockchain::{BitcoinClient, ElectedNode, EthereumClient},
		coordination::{keys, CoordinationStore},
		publisher::PublishOutcome,
		recovery::{RecoverySweeper, SweepReport},
	},
	utils::tests::{InMemoryCoordinationStore, NodeBuilder},
};

use crate::integration::mocks::{
	bitcoin_hash, ethereum_hash, InMemoryChainTransport, MockCoordinationStore,
	MockEventPublisher, RecordingPublisher,
};

fn elected() -> ElectedNode {
	ElectedNode::fixed(Some(NodeBuilder::new().build()))
}

fn ethereum_sweeper(
	chain: &InMemoryChainTransport,
	store: Arc<dyn CoordinationStore>,
	publisher: Arc<dyn chain_gateway::services::publisher::EventPublisher>,
	elected: ElectedNode,
) -> RecoverySweeper<EthereumClient<InMemoryChainTransport>> {
	RecoverySweeper::new(
		Arc::new(EthereumClient::new_with_transport(
			Arc::new(chain.clone()),
			elected,
			"ETHEREUM",
		)),
		store,
		publisher,
	)
}

#[tokio::test]
async fn test_empty_sweep_is_a_no_op() {
	let mut store = MockCoordinationStore::new();
	store.expect_get().returning(|_| Ok(None));
	store.expect_keys().returning(|_| Ok(Vec::new()));
	store.expect_del().times(0);

	let mut publisher = MockEventPublisher::new();
	publisher.expect_send_to_exchange().times(0);

	let sweeper = ethereum_sweeper(
		&InMemoryChainTransport::ethereum(3),
		Arc::new(store),
		Arc::new(publisher),
		elected(),
	);

	assert_eq!(sweeper.retry_unresolved().await, SweepReport::default());
	assert_eq!(sweeper.backfill_gaps().await, SweepReport::default());
}

#[tokio::test]
async fn test_sweeps_skip_while_reconnecting() {
	let store = InMemoryCoordinationStore::new();
	store.set_ex("nulltx:aa", "", 900).await.unwrap();
	store.set(&keys::gap_key(3), "").await.unwrap();
	store
		.set_ex(keys::RECONNECT_LOCK_KEY, "true", 600)
		.await
		.unwrap();
	let publisher = RecordingPublisher::new();

	let sweeper = ethereum_sweeper(
		&InMemoryChainTransport::ethereum(3),
		Arc::new(store.clone()),
		Arc::new(publisher.clone()),
		elected(),
	);

	assert!(sweeper.retry_unresolved().await.skipped);
	assert!(sweeper.backfill_gaps().await.skipped);
	assert!(publisher.events().is_empty());
	assert_eq!(store.live_keys().len(), 3);
}

#[tokio::test]
async fn test_sweeps_skip_without_elected_node() {
	let store = InMemoryCoordinationStore::new();
	let sweeper = ethereum_sweeper(
		&InMemoryChainTransport::ethereum(3),
		Arc::new(store),
		Arc::new(RecordingPublisher::new()),
		ElectedNode::fixed(None),
	);
	assert!(!sweeper.services_online().await);
	assert!(sweeper.retry_unresolved().await.skipped);
}

#[tokio::test]
async fn test_retry_unresolved_publishes_resolved_and_keeps_the_rest() {
	let chain = InMemoryChainTransport::bitcoin(6);
	chain.add_transaction("t1", json!({"txid": "t1"}));
	let store = InMemoryCoordinationStore::new();
	store.set_ex("nulltx:t1", "", 900).await.unwrap();
	store.set_ex("nulltx:t2", "", 900).await.unwrap();
	store
		.set_ex(&format!("nullblock:{}", bitcoin_hash(5)), "", 900)
		.await
		.unwrap();
	let publisher = RecordingPublisher::new();

	let sweeper = RecoverySweeper::new(
		Arc::new(BitcoinClient::new_with_transport(
			Arc::new(chain.clone()),
			elected(),
			"BITCOIN",
			false,
		)),
		Arc::new(store.clone()),
		Arc::new(publisher.clone()),
	);

	let report = sweeper.retry_unresolved().await;
	assert_eq!(
		report,
		SweepReport {
			scanned: 3,
			published: 2,
			skipped: false,
		}
	);
	assert_eq!(store.live_keys(), vec!["nulltx:t2"]);

	let events = publisher.events();
	assert_eq!(events.len(), 2);
	assert!(events
		.iter()
		.any(|(event, number)| event.kind() == EventKind::Transaction && number.is_none()));
	// Bitcoin-family blocks are never passed with a number
	assert!(events
		.iter()
		.any(|(event, number)| event.kind() == EventKind::Block && number.is_none()));
}

#[tokio::test]
async fn test_retry_unresolved_block_by_height() {
	let chain = InMemoryChainTransport::ethereum(9);
	let store = InMemoryCoordinationStore::new();
	store.set_ex("nullblock:9", "", 900).await.unwrap();
	let publisher = RecordingPublisher::new();

	let sweeper = ethereum_sweeper(
		&chain,
		Arc::new(store.clone()),
		Arc::new(publisher.clone()),
		elected(),
	);

	assert_eq!(sweeper.retry_unresolved().await.published, 1);
	let events = publisher.events();
	assert_eq!(events[0].0.payload()["hash"], json!(ethereum_hash(9)));
	assert_eq!(events[0].1, Some(9));
	assert!(store.live_keys().is_empty());
}

#[tokio::test]
async fn test_backfill_publishes_in_ascending_order() {
	let chain = InMemoryChainTransport::ethereum(20);
	chain.remove_block(15);
	let store = InMemoryCoordinationStore::new();
	for number in [17u64, 12, 15, 14] {
		store.set(&keys::gap_key(number), "").await.unwrap();
	}
	let publisher = RecordingPublisher::new();

	let sweeper = ethereum_sweeper(
		&chain,
		Arc::new(store.clone()),
		Arc::new(publisher.clone()),
		elected(),
	);

	let report = sweeper.backfill_gaps().await;
	assert_eq!(report.scanned, 4);
	assert_eq!(report.published, 3);

	let numbers: Vec<Option<u64>> = publisher.events().iter().map(|(_, n)| *n).collect();
	assert_eq!(numbers, vec![Some(12), Some(14), Some(17)]);
	// Unavailable blocks stay listed
	assert_eq!(store.live_keys(), vec!["blk:15"]);
}

#[tokio::test]
async fn test_failed_backfill_publish_leaves_exactly_one_entry() {
	let chain = InMemoryChainTransport::ethereum(20);
	let store = InMemoryCoordinationStore::new();
	store.set(&keys::gap_key(18), "").await.unwrap();

	// A deferred publish writes the entry back, like the broker publisher does
	struct Rewriting(InMemoryCoordinationStore);

	#[async_trait::async_trait]
	impl chain_gateway::services::publisher::EventPublisher for Rewriting {
		async fn connect(
			&self,
		) -> Result<bool, chain_gateway::services::publisher::PublisherError> {
			Ok(true)
		}

		async fn send_to_exchange(
			&self,
			_event: &chain_gateway::models::Event,
			block_number: Option<u64>,
		) -> PublishOutcome {
			if let Some(number) = block_number {
				self.0.set(&keys::gap_key(number), "").await.unwrap();
			}
			PublishOutcome::Deferred
		}

		async fn close(&self) {}
	}

	let sweeper = ethereum_sweeper(
		&chain,
		Arc::new(store.clone()),
		Arc::new(Rewriting(store.clone())),
		elected(),
	);

	sweeper.backfill_gaps().await;
	assert_eq!(store.keys(keys::GAP_PATTERN).await.unwrap(), vec!["blk:18"]);
}

#[tokio::test]
async fn test_backfill_is_a_no_op_for_bitcoin() {
	let store = InMemoryCoordinationStore::new();
	store.set(&keys::gap_key(3), "").await.unwrap();
	let publisher = RecordingPublisher::new();

	let sweeper = RecoverySweeper::new(
		Arc::new(BitcoinClient::new_with_transport(
			Arc::new(InMemoryChainTransport::bitcoin(3)),
			elected(),
			"BITCOIN",
			false,
		)),
		Arc::new(store.clone()),
		Arc::new(publisher.clone()),
	);

	assert_eq!(sweeper.backfill_gaps().await, SweepReport::default());
	assert!(publisher.events().is_empty());
	assert_eq!(store.live_keys(), vec!["blk:3"]);
}
