use serde::{Deserialize, Serialize};

/// Kind of object an event carries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventKind {
	#[serde(rename = "block")]
	Block,
	#[serde(rename = "tx")]
	Transaction,
}

impl EventKind {
	/// Routing pattern used on the broker
	pub fn pattern(&self) -> &'static str {
		match self {
			EventKind::Block => "block",
			EventKind::Transaction => "tx",
		}
	}
}

/// A raw reference pushed by a node subscription.
///
/// Bitcoin-family nodes only push hashes. Ethereum `newHeads` notifications also
/// carry the block number, which is used as a fallback when lookup by hash misses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChainReference {
	Block { hash: String, height: Option<u64> },
	Transaction { hash: String },
}

impl ChainReference {
	pub fn block(hash: impl Into<String>, height: Option<u64>) -> Self {
		ChainReference::Block {
			hash: hash.into(),
			height,
		}
	}

	pub fn transaction(hash: impl Into<String>) -> Self {
		ChainReference::Transaction { hash: hash.into() }
	}

	pub fn kind(&self) -> EventKind {
		match self {
			ChainReference::Block { .. } => EventKind::Block,
			ChainReference::Transaction { .. } => EventKind::Transaction,
		}
	}

	pub fn hash(&self) -> &str {
		match self {
			ChainReference::Block { hash, .. } => hash,
			ChainReference::Transaction { hash } => hash,
		}
	}

	pub fn height(&self) -> Option<u64> {
		match self {
			ChainReference::Block { height, .. } => *height,
			ChainReference::Transaction { .. } => None,
		}
	}
}
