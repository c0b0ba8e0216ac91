//! Recovery sweeper.
//!
//! Two periodic sweeps over the coordination store:
//!
//! - unresolved retry: references the node could not resolve when they were
//!   pushed (`nulltx:*`, `nullblock:*`)
//! - gap backfill: block numbers whose publish failed or that were missed
//!   while no subscription was open (`blk:*`)
//!
//! Markers are deleted before publishing. A marker that never resolves
//! expires with its TTL.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
	models::{ChainReference, Event, EventKind},
	services::{
		blockchain::{ChainAdapter, DEFAULT_VERBOSITY},
		coordination::{keys, CoordinationStore},
		ingestion::resolve_reference,
		publisher::EventPublisher,
	},
};

/// Counts from one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
	/// Entries found in the store
	pub scanned: usize,
	/// Entries resolved and handed to the publisher
	pub published: usize,
	/// Set when the sweep did not run because services are offline
	pub skipped: bool,
}

impl SweepReport {
	fn skipped() -> Self {
		Self {
			skipped: true,
			..Self::default()
		}
	}
}

pub struct RecoverySweeper<A> {
	adapter: Arc<A>,
	store: Arc<dyn CoordinationStore>,
	publisher: Arc<dyn EventPublisher>,
}

impl<A: ChainAdapter> RecoverySweeper<A> {
	pub fn new(
		adapter: Arc<A>,
		store: Arc<dyn CoordinationStore>,
		publisher: Arc<dyn EventPublisher>,
	) -> Self {
		Self {
			adapter,
			store,
			publisher,
		}
	}

	/// Brokers are not reconnecting and a node is elected
	pub async fn services_online(&self) -> bool {
		if !self.adapter.elected_node().is_elected() {
			return false;
		}
		match self.store.get(keys::RECONNECT_LOCK_KEY).await {
			Ok(lock) => lock.is_none(),
			Err(e) => {
				warn!(error = %e, "Cannot read broker reconnect lock");
				false
			}
		}
	}

	async fn scan(&self, pattern: &str) -> Vec<String> {
		match self.store.keys(pattern).await {
			Ok(keys) => keys,
			Err(e) => {
				warn!(pattern = %pattern, error = %e, "Failed to scan recovery entries");
				Vec::new()
			}
		}
	}

	async fn delete(&self, keys: &[String]) -> bool {
		match self.store.del(keys).await {
			Ok(()) => true,
			Err(e) => {
				warn!(error = %e, "Failed to delete recovery entries, leaving them for the next sweep");
				false
			}
		}
	}

	/// Retries references marked unresolved
	#[instrument(skip(self), fields(blockchain = %self.adapter.blockchain()))]
	pub async fn retry_unresolved(&self) -> SweepReport {
		if !self.services_online().await {
			warn!("Services offline, skipping unresolved retry");
			return SweepReport::skipped();
		}

		let mut marker_keys = self.scan(keys::UNRESOLVED_TX_PATTERN).await;
		marker_keys.extend(self.scan(keys::UNRESOLVED_BLOCK_PATTERN).await);
		let scanned = marker_keys.len();
		if scanned == 0 {
			return SweepReport::default();
		}

		let (tx_keys, block_keys): (Vec<_>, Vec<_>) = marker_keys
			.into_iter()
			.filter_map(|key| keys::parse_unresolved_key(&key).map(|reference| (key, reference)))
			.partition(|(_, reference)| matches!(reference, ChainReference::Transaction { .. }));

		let blockchain = self.adapter.blockchain();
		let mut resolved: Vec<(String, Event)> = Vec::new();

		let hashes: Vec<String> = tx_keys
			.iter()
			.map(|(_, reference)| reference.hash().to_string())
			.collect();
		let txs = self.adapter.get_txs_by_hash(&hashes).await;
		for ((key, _), tx) in tx_keys.into_iter().zip(txs) {
			if let Some(tx) = tx {
				resolved.push((key, Event::transaction(blockchain.clone(), tx)));
			}
		}

		for (key, reference) in block_keys {
			if let Some(block) = resolve_reference(self.adapter.as_ref(), &reference).await {
				resolved.push((key, Event::block(blockchain.clone(), block)));
			}
		}

		if resolved.is_empty() {
			debug!(scanned, "No unresolved reference could be resolved yet");
			return SweepReport {
				scanned,
				..SweepReport::default()
			};
		}

		let resolved_keys: Vec<String> = resolved.iter().map(|(key, _)| key.clone()).collect();
		if !self.delete(&resolved_keys).await {
			return SweepReport {
				scanned,
				..SweepReport::default()
			};
		}

		for (_, event) in &resolved {
			let number = self
				.adapter
				.block_number(event.payload())
				.filter(|_| self.adapter.tracks_block_gaps() && event.kind() == EventKind::Block);
			self.publisher.send_to_exchange(event, number).await;
		}

		info!(scanned, published = resolved.len(), "Unresolved references recovered");
		SweepReport {
			scanned,
			published: resolved.len(),
			skipped: false,
		}
	}

	/// Publishes blocks recorded in the gap skip-list
	#[instrument(skip(self), fields(blockchain = %self.adapter.blockchain()))]
	pub async fn backfill_gaps(&self) -> SweepReport {
		if !self.adapter.tracks_block_gaps() {
			return SweepReport::default();
		}
		if !self.services_online().await {
			warn!("Services offline, skipping gap backfill");
			return SweepReport::skipped();
		}

		let gap_keys = self.scan(keys::GAP_PATTERN).await;
		let scanned = gap_keys.len();
		let mut numbers: Vec<u64> = gap_keys
			.iter()
			.filter_map(|key| keys::parse_gap_key(key))
			.collect();
		if numbers.is_empty() {
			return SweepReport {
				scanned,
				..SweepReport::default()
			};
		}
		numbers.sort_unstable();
		numbers.dedup();

		let mut fetched = Vec::new();
		for number in numbers {
			match self
				.adapter
				.get_block_by_number(number, Some(DEFAULT_VERBOSITY))
				.await
			{
				Some(block) => fetched.push((number, block)),
				None => debug!(block = number, "Block still unavailable"),
			}
		}

		if fetched.is_empty() {
			return SweepReport {
				scanned,
				..SweepReport::default()
			};
		}

		let fetched_keys: Vec<String> = fetched
			.iter()
			.map(|(number, _)| keys::gap_key(*number))
			.collect();
		if !self.delete(&fetched_keys).await {
			return SweepReport {
				scanned,
				..SweepReport::default()
			};
		}

		let blockchain = self.adapter.blockchain();
		let published = fetched.len();
		for (number, block) in fetched {
			let event = Event::block(blockchain.clone(), block);
			self.publisher.send_to_exchange(&event, Some(number)).await;
		}

		info!(scanned, published, "Gap backfill done");
		SweepReport {
			scanned,
			published,
			skipped: false,
		}
	}
}
