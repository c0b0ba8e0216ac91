use serde_json::json;
use std::{sync::Arc, time::Duration};

use chain_gateway::{
	models::{Event, ExchangeTopology},
	services::{
		coordination::{keys, CoordinationStore},
		publisher::{
			AmqpEventPublisher, BrokerTarget, EventPublisher, PublishOutcome, PublisherSettings,
		},
	},
	utils::tests::InMemoryCoordinationStore,
};

use crate::integration::mocks::RecordingConnector;

fn settings(with_ledger: bool) -> PublisherSettings {
	PublisherSettings {
		ledger: with_ledger.then(|| BrokerTarget {
			url: "amqp://ledger:5672".to_string(),
			topology: ExchangeTopology::new("rpc", &["db"]),
		}),
		wallet: BrokerTarget {
			url: "amqp://wallet:5672".to_string(),
			topology: ExchangeTopology::new("walletXch", &["wallet"]),
		},
		reconnect_delay: Duration::from_millis(20),
		reconnect_lock_ttl_secs: 600,
	}
}

fn publisher(
	connector: &RecordingConnector,
	store: &InMemoryCoordinationStore,
	with_ledger: bool,
) -> Arc<AmqpEventPublisher> {
	Arc::new(AmqpEventPublisher::new(
		"ETHEREUM",
		settings(with_ledger),
		Arc::new(connector.clone()),
		Arc::new(store.clone()),
	))
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
	tokio::time::timeout(Duration::from_secs(5), async {
		while !condition() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("condition not reached in time");
}

#[tokio::test]
async fn test_publishes_to_every_configured_exchange() {
	let connector = RecordingConnector::new();
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, true);

	assert!(publisher.connect().await.unwrap());
	assert_eq!(connector.opened(), vec!["rpc", "walletXch"]);
	assert!(store.get(keys::RECONNECT_LOCK_KEY).await.unwrap().is_none());

	let event = Event::transaction("ETHEREUM", json!({"hash": "0xaa"}));
	assert_eq!(
		publisher.send_to_exchange(&event, None).await,
		PublishOutcome::Published
	);

	let published = connector.published();
	assert_eq!(published.len(), 2);
	assert_eq!(published[0].0, "rpc");
	assert_eq!(published[1].0, "walletXch");
	for (_, message) in published {
		assert_eq!(message.pattern, "tx");
		assert_eq!(message.data.blockchain, "ETHEREUM");
		assert_eq!(message.data.data, json!({"hash": "0xaa"}));
	}
}

#[tokio::test]
async fn test_concurrent_connects_open_topology_once() {
	let connector = RecordingConnector::gated();
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, false);

	let first = {
		let publisher = publisher.clone();
		tokio::spawn(async move { publisher.connect().await })
	};
	let opened = connector.clone();
	wait_for(move || opened.opened().len() == 1).await;

	// The first connect holds the reconnect lock
	assert!(!publisher.connect().await.unwrap());

	connector.release();
	assert!(first.await.unwrap().unwrap());
	assert_eq!(connector.opened(), vec!["walletXch"]);
}

#[tokio::test]
async fn test_failed_block_publish_is_recorded_once() {
	let connector = RecordingConnector::new();
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, false);
	publisher.connect().await.unwrap();
	connector.set_down(true);

	let event = Event::block("ETHEREUM", json!({"number": "0x2a"}));
	assert_eq!(
		publisher.send_to_exchange(&event, Some(42)).await,
		PublishOutcome::Deferred
	);
	assert_eq!(
		publisher.send_to_exchange(&event, Some(42)).await,
		PublishOutcome::Deferred
	);

	assert_eq!(store.keys(keys::GAP_PATTERN).await.unwrap(), vec!["blk:42"]);
	assert!(connector.published().is_empty());
}

#[tokio::test]
async fn test_failed_publish_without_number_is_dropped() {
	let connector = RecordingConnector::new();
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, false);

	// Never connected
	let event = Event::block("BITCOIN", json!({"height": 1}));
	assert_eq!(
		publisher.send_to_exchange(&event, None).await,
		PublishOutcome::Dropped
	);
	assert!(store.keys(keys::GAP_PATTERN).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_broker_failure_triggers_reconnect() {
	let connector = RecordingConnector::new();
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, true);
	publisher.connect().await.unwrap();

	connector.fail_connections();

	let reopened = connector.clone();
	wait_for(move || reopened.opened().len() == 4).await;
	assert_eq!(connector.closed(), 2);

	let event = Event::transaction("ETHEREUM", json!({}));
	assert_eq!(
		publisher.send_to_exchange(&event, None).await,
		PublishOutcome::Published
	);
}

#[tokio::test]
async fn test_refused_connect_is_retried() {
	let connector = RecordingConnector::new();
	connector.set_refuse(true);
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, false);

	assert!(publisher.connect().await.is_err());
	// Lock stays held until the scheduled retry
	assert!(store.get(keys::RECONNECT_LOCK_KEY).await.unwrap().is_some());

	connector.set_refuse(false);
	let reopened = connector.clone();
	wait_for(move || reopened.opened().len() == 1).await;

	let lock = store.clone();
	wait_for(move || !lock.live_keys().contains(&keys::RECONNECT_LOCK_KEY.to_string())).await;
	publisher.close().await;
}

#[tokio::test]
async fn test_close_stops_publishing() {
	let connector = RecordingConnector::new();
	let store = InMemoryCoordinationStore::new();
	let publisher = publisher(&connector, &store, true);
	publisher.connect().await.unwrap();

	publisher.close().await;
	assert_eq!(connector.closed(), 2);

	connector.fail_connections();
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(connector.opened().len(), 2);

	let event = Event::transaction("ETHEREUM", json!({}));
	assert_eq!(
		publisher.send_to_exchange(&event, None).await,
		PublishOutcome::Dropped
	);
}
