//! Node selector.
//!
//! Probes every configured node, applies [`choose_node`] and publishes the
//! winner on the elected-node channel. It owns the only sender of that channel.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{info, instrument, warn};

use crate::{
	models::{Node, SyncStatus},
	services::{
		blockchain::{ChainAdapter, ElectedNode},
		election::rule::choose_node,
	},
	utils::metrics::{record_election, ELECTIONS},
};

/// Runs election rounds
#[async_trait]
pub trait NodeSelectorTrait: Send + Sync {
	/// Runs one round and returns the elected node after it
	async fn select_node(&self) -> Option<Node>;

	/// Read handle on the elected node
	fn elected(&self) -> ElectedNode;
}

pub struct NodeSelector<A> {
	adapter: Arc<A>,
	nodes: Vec<Node>,
	sender: watch::Sender<Option<Node>>,
	elected: ElectedNode,
	/// Rounds from the cron job and from the listener never overlap
	round: Mutex<()>,
}

impl<A: ChainAdapter> NodeSelector<A> {
	pub fn new(
		adapter: Arc<A>,
		nodes: Vec<Node>,
		sender: watch::Sender<Option<Node>>,
		elected: ElectedNode,
	) -> Self {
		Self {
			adapter,
			nodes,
			sender,
			elected,
			round: Mutex::new(()),
		}
	}

	async fn probe_all(&self) -> Vec<(Node, Option<SyncStatus>)> {
		let mut probes = Vec::with_capacity(self.nodes.len());
		for node in &self.nodes {
			let status = match self.adapter.probe(node).await {
				Ok(status) => Some(status),
				Err(e) => {
					warn!(node = %node.name, error = %e, "Node unreachable during election");
					None
				}
			};
			probes.push((node.clone(), status));
		}
		probes
	}
}

#[async_trait]
impl<A: ChainAdapter + 'static> NodeSelectorTrait for NodeSelector<A> {
	#[instrument(skip(self), fields(blockchain = %self.adapter.blockchain()))]
	async fn select_node(&self) -> Option<Node> {
		let _round = self.round.lock().await;
		let blockchain = self.adapter.blockchain();
		let probes = self.probe_all().await;

		let Some(election) = choose_node(&probes) else {
			warn!("No node reachable, keeping the current election");
			ELECTIONS
				.with_label_values(&[blockchain.as_str(), "unreachable"])
				.inc();
			return self.elected.current();
		};

		let changed = self.sender.send_if_modified(|current| {
			let same = current
				.as_ref()
				.map(|node| node.name == election.node.name)
				.unwrap_or(false);
			if !same {
				*current = Some(election.node.clone());
			}
			!same
		});

		if changed {
			info!(
				node = %election.node.name,
				height = election.height,
				"Elected node changed"
			);
		}
		record_election(&blockchain, &election.node.name, election.height, changed);

		Some(election.node)
	}

	fn elected(&self) -> ElectedNode {
		self.elected.clone()
	}
}
