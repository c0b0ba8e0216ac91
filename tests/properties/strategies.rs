use chain_gateway::models::{Node, SyncStatus};
use chain_gateway::utils::tests::NodeBuilder;
use proptest::{option, prelude::*};

pub const MAX_NODES: usize = 8;

pub fn sync_status_strategy() -> impl Strategy<Value = SyncStatus> {
	(
		0u64..1_000_000,
		any::<bool>(),
		option::of(prop_oneof![
			Just(String::new()),
			Just("Warning: We do not appear to fully agree with our peers!".to_string()),
			"[a-z ]{1,20}".prop_map(|s| s.to_string()),
		]),
	)
		.prop_map(|(height, initial_sync, warnings)| SyncStatus {
			height,
			initial_sync,
			warnings,
		})
}

/// Probe results for a pool of distinct nodes; `None` is an unreachable node
pub fn probes_strategy() -> impl Strategy<Value = Vec<(Node, Option<SyncStatus>)>> {
	prop::collection::vec(option::of(sync_status_strategy()), 0..MAX_NODES).prop_map(|statuses| {
		statuses
			.into_iter()
			.enumerate()
			.map(|(index, status)| {
				let name = format!("node-{}", index);
				(NodeBuilder::new().name(&name).host(&name).build(), status)
			})
			.collect()
	})
}

pub fn hash_strategy() -> impl Strategy<Value = String> {
	prop_oneof!["[0-9a-f]{64}", "0x[0-9a-f]{64}"].prop_map(|s| s.to_string())
}
