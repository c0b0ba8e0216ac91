//! Key naming in the coordination store.
//!
//! Locks and markers are shared with other gateway instances, so the names are
//! part of the wire contract.

use crate::models::{ChainReference, EventKind};

/// Held while an instance is (re)connecting to the brokers
pub const RECONNECT_LOCK_KEY: &str = "lock:rmqconnecting";

/// Height of the last block handed to the publisher
pub const LAST_SENT_BLOCK_KEY: &str = "lastSentBlockNumber";

const TX_LOCK_PREFIX: &str = "lock:tx:";
const BLOCK_LOCK_PREFIX: &str = "lock:block:";
const UNRESOLVED_TX_PREFIX: &str = "nulltx:";
const UNRESOLVED_BLOCK_PREFIX: &str = "nullblock:";
const GAP_PREFIX: &str = "blk:";

pub const UNRESOLVED_TX_PATTERN: &str = "nulltx:*";
pub const UNRESOLVED_BLOCK_PATTERN: &str = "nullblock:*";
pub const GAP_PATTERN: &str = "blk:*";

/// Dedup lock for a reference
pub fn lock_key(reference: &ChainReference) -> String {
	match reference.kind() {
		EventKind::Transaction => format!("{}{}", TX_LOCK_PREFIX, reference.hash()),
		EventKind::Block => format!("{}{}", BLOCK_LOCK_PREFIX, reference.hash()),
	}
}

/// Marker for a reference that could not be resolved yet.
///
/// Blocks are keyed by height when the reference carries one.
pub fn unresolved_key(reference: &ChainReference) -> String {
	match reference {
		ChainReference::Transaction { hash } => format!("{}{}", UNRESOLVED_TX_PREFIX, hash),
		ChainReference::Block {
			height: Some(height),
			..
		} => format!("{}{}", UNRESOLVED_BLOCK_PREFIX, height),
		ChainReference::Block { hash, .. } => format!("{}{}", UNRESOLVED_BLOCK_PREFIX, hash),
	}
}

/// Skip-list entry for a block whose publish failed
pub fn gap_key(number: u64) -> String {
	format!("{}{}", GAP_PREFIX, number)
}

/// Block number of a `blk:` entry
pub fn parse_gap_key(key: &str) -> Option<u64> {
	key.strip_prefix(GAP_PREFIX)?.parse().ok()
}

/// Heights are short decimals; anything else is a hash
fn looks_like_height(value: &str) -> bool {
	!value.is_empty() && value.len() <= 20 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Reference recorded by an unresolved marker key
pub fn parse_unresolved_key(key: &str) -> Option<ChainReference> {
	if let Some(hash) = key.strip_prefix(UNRESOLVED_TX_PREFIX) {
		return (!hash.is_empty()).then(|| ChainReference::transaction(hash));
	}

	let value = key.strip_prefix(UNRESOLVED_BLOCK_PREFIX)?;
	if looks_like_height(value) {
		let height = value.parse().ok()?;
		Some(ChainReference::Block {
			hash: String::new(),
			height: Some(height),
		})
	} else if value.is_empty() {
		None
	} else {
		Some(ChainReference::block(value, None))
	}
}
