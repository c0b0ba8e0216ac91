use crate::properties::strategies::probes_strategy;

use chain_gateway::services::election::choose_node;
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_highest_eligible_node_wins(probes in probes_strategy()) {
		let best = probes
			.iter()
			.filter_map(|(node, status)| status.as_ref().map(|s| (node, s)))
			.filter(|(_, status)| status.is_eligible())
			.map(|(_, status)| status.height)
			.max();

		if let Some(best) = best {
			let election = choose_node(&probes).unwrap();
			prop_assert_eq!(election.height, best);

			// Ties go to the later node in configuration order
			let last_best = probes
				.iter()
				.rev()
				.find(|(_, status)| {
					status
						.as_ref()
						.map(|s| s.is_eligible() && s.height == best)
						.unwrap_or(false)
				})
				.map(|(node, _)| node.name.clone());
			prop_assert_eq!(Some(election.node.name), last_best);
		}
	}

	#[test]
	fn test_first_reachable_node_is_fallback(probes in probes_strategy()) {
		let any_eligible = probes
			.iter()
			.any(|(_, status)| status.as_ref().map(|s| s.is_eligible()).unwrap_or(false));
		prop_assume!(!any_eligible);

		let first_reachable = probes
			.iter()
			.find(|(_, status)| status.is_some())
			.map(|(node, _)| node.name.clone());

		prop_assert_eq!(
			choose_node(&probes).map(|election| election.node.name),
			first_reachable
		);
	}

	#[test]
	fn test_winner_was_reachable(probes in probes_strategy()) {
		if let Some(election) = choose_node(&probes) {
			let status = probes
				.iter()
				.find(|(node, _)| node.name == election.node.name)
				.and_then(|(_, status)| status.clone());
			prop_assert_eq!(status.map(|s| s.height), Some(election.height));
		} else {
			prop_assert!(probes.iter().all(|(_, status)| status.is_none()));
		}
	}
}
