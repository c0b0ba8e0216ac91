//! The election rule.

use crate::models::{Node, SyncStatus};

/// Winner of an election round
#[derive(Debug, Clone, PartialEq)]
pub struct Election {
	pub node: Node,
	pub height: u64,
}

/// Picks the authoritative node from probe results, in configuration order.
///
/// `None` statuses are unreachable nodes and are skipped. The first reachable
/// node is the fallback. Among eligible nodes (done with initial sync, no
/// chain-disagreement warning) the highest one wins; on a tie the later node
/// wins. Returns `None` when no node was reachable.
pub fn choose_node(probes: &[(Node, Option<SyncStatus>)]) -> Option<Election> {
	let mut chosen: Option<Election> = None;
	let mut best_height = 0;

	for (node, status) in probes {
		let Some(status) = status else {
			continue;
		};

		if chosen.is_none() {
			chosen = Some(Election {
				node: node.clone(),
				height: status.height,
			});
		}

		if status.is_eligible() && status.height >= best_height {
			best_height = status.height;
			chosen = Some(Election {
				node: node.clone(),
				height: status.height,
			});
		}
	}

	chosen
}
