//! Chain-agnostic models shared by every adapter.
//!
//! - `event`: events published to the broker and their wire shape
//! - `filter`: block selection filters for bulk retrieval
//! - `info`: node summary and sync status used for election
//! - `reference`: raw block/transaction references pushed by nodes

use serde::{Deserialize, Serialize};
use std::fmt;

mod event;
mod filter;
mod info;
mod reference;

pub use event::{BrokerMessage, Event, EventData};
pub use filter::{BlockHashFilter, BlockNumFilter, BlocksFilter};
pub use info::{NodeInfo, SyncStatus};
pub use reference::{ChainReference, EventKind};

/// Protocol family of the configured blockchain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
	/// JSON-RPC 1.0 over HTTP with ZeroMQ push notifications
	Bitcoin,
	/// JSON-RPC 2.0 over HTTP with WebSocket subscriptions
	Ethereum,
}

impl fmt::Display for ChainFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainFamily::Bitcoin => write!(f, "bitcoin"),
			ChainFamily::Ethereum => write!(f, "ethereum"),
		}
	}
}
