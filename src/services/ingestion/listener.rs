//! Ingestion listener.
//!
//! Follows the elected node: keeps at most one push subscription open on it,
//! and turns every pushed reference into a published event. Each reference is
//! deduplicated across instances with a short-lived lock, resolved, and
//! published. References the node cannot resolve yet are marked for the
//! recovery sweeper.

use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
	models::{ChainReference, Event, EventKind, IngestionConfig, Node},
	services::{
		blockchain::{ChainAdapter, NotificationItem, NotificationStream},
		coordination::{keys, try_acquire_lock, CoordinationStore},
		election::NodeSelectorTrait,
		ingestion::resolve::resolve_reference,
		publisher::{EventPublisher, PublishOutcome},
	},
	utils::metrics::{BLOCKS_DEFERRED, UNRESOLVED_MARKERS},
};

/// Wait before subscribing again after a failed or broken subscription
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Result of handling one pushed reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOutcome {
	/// Another handler holds the lock
	Duplicate,
	/// The node could not resolve it; a marker was set
	Unresolved,
	Handled(PublishOutcome),
}

enum ListenerState {
	Idle,
	Subscribed {
		node: Node,
		stream: NotificationStream,
	},
}

impl ListenerState {
	async fn next(&mut self) -> Option<NotificationItem> {
		match self {
			ListenerState::Subscribed { stream, .. } => stream.next().await,
			ListenerState::Idle => std::future::pending().await,
		}
	}

	fn teardown(self) {
		if let ListenerState::Subscribed { node, stream } = self {
			debug!(node = %node.name, "Closing subscription");
			stream.cancel();
		}
	}

	fn is_idle(&self) -> bool {
		matches!(self, ListenerState::Idle)
	}
}

enum Wake {
	Shutdown,
	Elected,
	ElectionClosed,
	Item(Option<NotificationItem>),
	Retry,
}

pub struct IngestionListener<A> {
	adapter: Arc<A>,
	store: Arc<dyn CoordinationStore>,
	publisher: Arc<dyn EventPublisher>,
	selector: Arc<dyn NodeSelectorTrait>,
	settings: IngestionConfig,
}

impl<A: ChainAdapter + 'static> IngestionListener<A> {
	pub fn new(
		adapter: Arc<A>,
		store: Arc<dyn CoordinationStore>,
		publisher: Arc<dyn EventPublisher>,
		selector: Arc<dyn NodeSelectorTrait>,
		settings: IngestionConfig,
	) -> Self {
		Self {
			adapter,
			store,
			publisher,
			selector,
			settings,
		}
	}

	/// Runs until `shutdown` is cancelled or the election channel closes
	pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
		let mut changes = self.adapter.elected_node().subscribe();
		let initial = changes.borrow_and_update().clone();
		let mut state = self.switch(ListenerState::Idle, initial).await;
		let mut retry_pending = state.is_idle() && self.adapter.elected_node().is_elected();

		loop {
			let wake = tokio::select! {
				biased;
				_ = shutdown.cancelled() => Wake::Shutdown,
				changed = changes.changed() => match changed {
					Ok(()) => Wake::Elected,
					Err(_) => Wake::ElectionClosed,
				},
				item = state.next() => Wake::Item(item),
				_ = tokio::time::sleep(RESUBSCRIBE_DELAY), if retry_pending => Wake::Retry,
			};

			match wake {
				Wake::Shutdown | Wake::ElectionClosed => {
					state.teardown();
					info!("Ingestion listener stopped");
					return;
				}
				Wake::Elected => {
					let node = changes.borrow_and_update().clone();
					retry_pending = node.is_some();
					state = self.switch(state, node).await;
					retry_pending &= state.is_idle();
				}
				Wake::Item(Some(Ok(reference))) => {
					let listener = self.clone();
					tokio::spawn(async move {
						listener.handle_reference(reference).await;
					});
				}
				Wake::Item(Some(Err(e))) => {
					warn!(error = %e, "Subscription failed, re-electing");
					state.teardown();
					state = self.reelect(&mut changes).await;
					retry_pending = state.is_idle() && self.adapter.elected_node().is_elected();
				}
				Wake::Item(None) => {
					warn!("Subscription ended, re-electing");
					state.teardown();
					state = self.reelect(&mut changes).await;
					retry_pending = state.is_idle() && self.adapter.elected_node().is_elected();
				}
				Wake::Retry => {
					state = self.reelect(&mut changes).await;
					retry_pending = state.is_idle() && self.adapter.elected_node().is_elected();
				}
			}
		}
	}

	/// Runs an election round, then subscribes to whatever node is elected
	async fn reelect(
		&self,
		changes: &mut tokio::sync::watch::Receiver<Option<Node>>,
	) -> ListenerState {
		self.selector.select_node().await;
		let node = changes.borrow_and_update().clone();
		self.switch(ListenerState::Idle, node).await
	}

	/// Moves the subscription to `node`
	async fn switch(&self, state: ListenerState, node: Option<Node>) -> ListenerState {
		if let (ListenerState::Subscribed { node: current, .. }, Some(next)) = (&state, &node) {
			if current.same_target(next) {
				debug!(node = %next.name, "Keeping subscription on the same node");
				return state;
			}
		}

		state.teardown();

		let Some(node) = node else {
			info!("No node elected, ingestion idle");
			return ListenerState::Idle;
		};

		match self.adapter.subscribe(&node).await {
			Ok(stream) => {
				info!(node = %node.name, "Subscribed to node notifications");
				if self.settings.check_missed_blocks && self.adapter.tracks_block_gaps() {
					self.check_missed_blocks().await;
				}
				ListenerState::Subscribed { node, stream }
			}
			Err(e) => {
				error!(node = %node.name, error = %e, "Failed to subscribe to node");
				ListenerState::Idle
			}
		}
	}

	/// Records every block between the last published one and the head.
	///
	/// Without a last-published marker the marker is seeded with the head and
	/// nothing is recorded.
	pub async fn check_missed_blocks(&self) {
		let Some(head) = self.adapter.get_block_count().await else {
			warn!("Head height unavailable, skipping missed block check");
			return;
		};

		let last = match self.store.get(keys::LAST_SENT_BLOCK_KEY).await {
			Ok(value) => value.and_then(|value| value.trim().parse::<u64>().ok()),
			Err(e) => {
				warn!(error = %e, "Cannot read last published block");
				return;
			}
		};

		let Some(last) = last else {
			if let Err(e) = self
				.store
				.set(keys::LAST_SENT_BLOCK_KEY, &head.to_string())
				.await
			{
				warn!(error = %e, "Failed to seed last published block");
			}
			return;
		};

		if last >= head {
			return;
		}

		info!(from = last + 1, to = head, "Recording missed blocks");
		let blockchain = self.adapter.blockchain();
		for number in last + 1..=head {
			match self.store.set(&keys::gap_key(number), "").await {
				Ok(()) => BLOCKS_DEFERRED.with_label_values(&[blockchain.as_str()]).inc(),
				Err(e) => warn!(block = number, error = %e, "Failed to record missed block"),
			}
		}
	}

	fn lock_settings(&self, kind: EventKind) -> Option<u64> {
		match kind {
			EventKind::Transaction if !self.settings.disable_tx_lock => {
				Some(self.settings.tx_lock_ttl_secs)
			}
			EventKind::Block if !self.settings.disable_block_lock => {
				Some(self.settings.block_lock_ttl_secs)
			}
			_ => None,
		}
	}

	/// Deduplicates, resolves and publishes one reference
	#[instrument(skip(self), fields(hash = %reference.hash()))]
	pub async fn handle_reference(&self, reference: ChainReference) -> ReferenceOutcome {
		let kind = reference.kind();

		if let Some(ttl) = self.lock_settings(kind) {
			if !try_acquire_lock(self.store.as_ref(), &keys::lock_key(&reference), ttl).await {
				debug!("Reference already handled");
				return ReferenceOutcome::Duplicate;
			}
		}

		let Some(payload) = resolve_reference(self.adapter.as_ref(), &reference).await else {
			self.mark_unresolved(&reference).await;
			return ReferenceOutcome::Unresolved;
		};

		let blockchain = self.adapter.blockchain();
		match kind {
			EventKind::Transaction => {
				let event = Event::transaction(blockchain, payload);
				ReferenceOutcome::Handled(self.publisher.send_to_exchange(&event, None).await)
			}
			EventKind::Block => {
				let number = self.adapter.block_number(&payload);
				let gap_number = number.filter(|_| self.adapter.tracks_block_gaps());
				let event = Event::block(blockchain, payload);

				let outcome = self.publisher.send_to_exchange(&event, gap_number).await;
				if outcome != PublishOutcome::Dropped {
					if let Some(number) = number {
						if let Err(e) = self
							.store
							.set(keys::LAST_SENT_BLOCK_KEY, &number.to_string())
							.await
						{
							warn!(block = number, error = %e, "Failed to store last published block");
						}
					}
				}
				debug!(block = ?number, outcome = ?outcome, "Block handled");
				ReferenceOutcome::Handled(outcome)
			}
		}
	}

	async fn mark_unresolved(&self, reference: &ChainReference) {
		let key = keys::unresolved_key(reference);
		UNRESOLVED_MARKERS
			.with_label_values(&[self.adapter.blockchain().as_str(), reference.kind().pattern()])
			.inc();
		debug!(key = %key, "Reference not resolvable yet");
		if let Err(e) = self
			.store
			.set_ex(&key, "", self.settings.unresolved_ttl_secs)
			.await
		{
			warn!(key = %key, error = %e, "Failed to record unresolved reference");
		}
	}
}
