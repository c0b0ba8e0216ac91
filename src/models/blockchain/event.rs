use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::blockchain::EventKind;

/// A resolved block or transaction ready to be published.
///
/// Fields are private; an event is built once and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
	kind: EventKind,
	chain: String,
	payload: Value,
}

impl Event {
	pub fn new(kind: EventKind, chain: impl Into<String>, payload: Value) -> Self {
		Self {
			kind,
			chain: chain.into(),
			payload,
		}
	}

	pub fn block(chain: impl Into<String>, payload: Value) -> Self {
		Self::new(EventKind::Block, chain, payload)
	}

	pub fn transaction(chain: impl Into<String>, payload: Value) -> Self {
		Self::new(EventKind::Transaction, chain, payload)
	}

	pub fn kind(&self) -> EventKind {
		self.kind
	}

	pub fn chain(&self) -> &str {
		&self.chain
	}

	pub fn payload(&self) -> &Value {
		&self.payload
	}

	/// Builds the message published on the broker
	pub fn to_message(&self) -> BrokerMessage {
		BrokerMessage {
			pattern: self.kind.pattern().to_string(),
			data: EventData {
				blockchain: self.chain.clone(),
				data: self.payload.clone(),
			},
		}
	}
}

/// `{"pattern": ..., "data": {"blockchain": ..., "data": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrokerMessage {
	pub pattern: String,
	pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventData {
	pub blockchain: String,
	pub data: Value,
}
