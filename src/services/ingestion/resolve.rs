//! Resolution of raw references into full payloads.

use serde_json::Value;

use crate::{
	models::ChainReference,
	services::blockchain::{ChainAdapter, DEFAULT_VERBOSITY},
};

/// Fetches the payload a reference points to.
///
/// Blocks are looked up by hash, then by height when the reference carries
/// one. `None` means the node does not know the reference (yet).
pub async fn resolve_reference<A>(adapter: &A, reference: &ChainReference) -> Option<Value>
where
	A: ChainAdapter + ?Sized,
{
	match reference {
		ChainReference::Transaction { hash } => adapter
			.get_txs_by_hash(std::slice::from_ref(hash))
			.await
			.into_iter()
			.next()
			.flatten(),
		ChainReference::Block { hash, height } => {
			if !hash.is_empty() {
				if let Some(block) = adapter.get_block_by_hash(hash, Some(DEFAULT_VERBOSITY)).await {
					return Some(block);
				}
			}
			match height {
				Some(height) => {
					adapter
						.get_block_by_number(*height, Some(DEFAULT_VERBOSITY))
						.await
				}
				None => None,
			}
		}
	}
}
