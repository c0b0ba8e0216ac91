use serde::{Deserialize, Serialize};

/// Summary returned by `get_info`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
	pub block_count: u64,
	pub peer_count: u64,
}

/// Result of probing a node during election
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
	pub height: u64,
	pub initial_sync: bool,
	pub warnings: Option<String>,
}

impl SyncStatus {
	/// Nodes still syncing, or warning that they disagree with the network, never win.
	pub fn is_eligible(&self) -> bool {
		if self.initial_sync {
			return false;
		}
		!self
			.warnings
			.as_deref()
			.map(|warnings| warnings.contains("agree"))
			.unwrap_or(false)
	}
}
