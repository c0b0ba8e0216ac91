//! Read side of the elected node.
//!
//! The node selector owns the only `watch::Sender`; every other component
//! holds an [`ElectedNode`] and reads or awaits the latest value.

use tokio::sync::watch;

use crate::models::Node;

/// Cheaply cloneable handle on the currently elected node
#[derive(Clone, Debug)]
pub struct ElectedNode {
	receiver: watch::Receiver<Option<Node>>,
}

impl ElectedNode {
	/// Creates the channel with no node elected yet
	pub fn channel() -> (watch::Sender<Option<Node>>, ElectedNode) {
		let (sender, receiver) = watch::channel(None);
		(sender, ElectedNode { receiver })
	}

	/// A handle that always reports `node`; used where no election runs
	pub fn fixed(node: Option<Node>) -> ElectedNode {
		let (_, receiver) = watch::channel(node);
		ElectedNode { receiver }
	}

	/// Snapshot of the elected node
	pub fn current(&self) -> Option<Node> {
		self.receiver.borrow().clone()
	}

	pub fn is_elected(&self) -> bool {
		self.receiver.borrow().is_some()
	}

	/// A receiver for awaiting changes
	pub fn subscribe(&self) -> watch::Receiver<Option<Node>> {
		self.receiver.clone()
	}
}
