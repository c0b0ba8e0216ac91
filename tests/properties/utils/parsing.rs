use chain_gateway::utils::{parse_hex_quantity, to_hex_quantity};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_hex_quantity_roundtrip(value in any::<u64>()) {
		let encoded = to_hex_quantity(value);
		prop_assert!(encoded.starts_with("0x"));
		prop_assert_eq!(parse_hex_quantity(&encoded), Some(value));
	}

	#[test]
	fn test_hex_quantity_has_no_leading_zeros(value in 1u64..) {
		let encoded = to_hex_quantity(value);
		prop_assert!(!encoded.starts_with("0x0"));
	}

	#[test]
	fn test_non_hex_input_is_rejected(value in "0x[g-z]{1,8}") {
		prop_assert_eq!(parse_hex_quantity(&value), None);
	}

	#[test]
	fn test_doubled_prefix_is_rejected(value in any::<u64>()) {
		let doubled = format!("0x{}", to_hex_quantity(value));
		prop_assert_eq!(parse_hex_quantity(&doubled), None);
	}
}
