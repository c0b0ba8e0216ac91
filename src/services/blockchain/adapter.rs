//! Chain adapter interface.
//!
//! An adapter hides one protocol family behind the operations the gateway
//! needs: routed calls, block and transaction lookup, node probing and push
//! subscriptions.

use async_trait::async_trait;
use serde_json::Value;

use crate::{
	models::{BlocksFilter, ChainFamily, Node, NodeInfo, SyncStatus},
	services::blockchain::{notifications::NotificationStream, BlockChainError, ElectedNode},
};

/// Verbosity used when the caller does not pass one
pub const DEFAULT_VERBOSITY: u8 = 2;

/// Defines the interface every chain family implements
///
/// Calls are routed to the node currently held by [`ElectedNode`]. Internal
/// lookups return `None` on any failure; operations exposed to API callers
/// return a [`BlockChainError`] instead.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
	fn family(&self) -> ChainFamily;

	/// Blockchain name as published in events
	fn blockchain(&self) -> String;

	fn elected_node(&self) -> ElectedNode;

	/// Sends one JSON-RPC request to the elected node
	///
	/// # Arguments
	/// * `method` - RPC method name
	/// * `params` - Positional parameters
	///
	/// # Returns
	/// * `Option<Value>` - The `result` member, or `None` on a transport or node
	///   error, or when no node is elected
	async fn call(&self, method: &str, params: Value) -> Option<Value>;

	/// Calls an explicit node; failures and missing results are `None`
	async fn call_node(&self, node: &Node, method: &str, params: Value) -> Option<Value>;

	/// Reads the sync state of `node` for the election
	///
	/// # Arguments
	/// * `node` - Node to probe, elected or not
	///
	/// # Returns
	/// * `Result<SyncStatus, BlockChainError>` - Height, initial-sync flag and
	///   warnings, or an error when the node is unreachable
	async fn probe(&self, node: &Node) -> Result<SyncStatus, BlockChainError>;

	/// Block count and peer count of the elected node
	///
	/// # Returns
	/// * `Result<NodeInfo, BlockChainError>` - Fails if either value is missing
	async fn get_info(&self) -> Result<NodeInfo, BlockChainError>;

	/// Relays an arbitrary JSON-RPC call from an API caller
	///
	/// # Arguments
	/// * `id` - Request id sent to the node
	/// * `method` - RPC method name
	/// * `params` - Positional parameters
	///
	/// # Returns
	/// * `Result<Value, BlockChainError>` - The node's result. A node-reported
	///   error becomes `NodeError` with its code and message, other failures
	///   become `ConnectionError`, and `NoElectedNode` is returned when no node
	///   is elected
	async fn rpc_call(
		&self,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError>;

	/// Like `rpc_call`, with the contract name as request id
	async fn contract_call(
		&self,
		contract: &str,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		self.rpc_call(Value::from(contract), method, params).await
	}

	/// Broadcasts a signed raw transaction
	///
	/// # Arguments
	/// * `raw_tx` - Hex-encoded signed transaction
	///
	/// # Returns
	/// * `Result<Value, BlockChainError>` - The transaction id, with the same
	///   error mapping as [`ChainAdapter::rpc_call`]
	async fn send_signed_transaction(&self, raw_tx: &str) -> Result<Value, BlockChainError>;

	/// Best block of the elected node
	async fn get_current_block(&self, verbosity: Option<u8>) -> Option<Value>;

	/// Retrieves a block by height
	///
	/// # Arguments
	/// * `number` - Block height
	/// * `verbosity` - Detail level; `None` uses the family default
	///
	/// # Returns
	/// * `Option<Value>` - The block payload, or `None` if the node does not have it
	async fn get_block_by_number(&self, number: u64, verbosity: Option<u8>) -> Option<Value>;

	async fn get_block_by_hash(&self, hash: &str, verbosity: Option<u8>) -> Option<Value>;

	/// Contiguous ascending blocks from `from` to `to`, failing on any missing link
	async fn get_block_range_by_hash(
		&self,
		from: &str,
		to: &str,
		verbosity: Option<u8>,
	) -> Result<Vec<Value>, BlockChainError>;

	/// Contiguous ascending blocks with heights `from..=to`
	///
	/// # Arguments
	/// * `from` - First height, inclusive
	/// * `to` - Last height, inclusive
	/// * `verbosity` - Detail level for every block
	///
	/// # Returns
	/// * `Result<Vec<Value>, BlockChainError>` - The blocks in ascending order.
	///   `from > to` is a `RequestError`; any missing link is `BlockNotFound`
	async fn get_block_range_by_number(
		&self,
		from: u64,
		to: u64,
		verbosity: Option<u8>,
	) -> Result<Vec<Value>, BlockChainError>;

	/// Resolves a block filter.
	///
	/// The hash filter wins over the number filter. Explicit list entries are
	/// resolved independently and keep their position (`None` when missing);
	/// range results follow the list results.
	async fn get_blocks(
		&self,
		filter: &BlocksFilter,
		verbosity: Option<u8>,
	) -> Result<Vec<Option<Value>>, BlockChainError> {
		let mut blocks = Vec::new();

		if let Some(hash_filter) = &filter.hash_filter {
			for hash in hash_filter.block_hashes.iter().flatten() {
				blocks.push(self.get_block_by_hash(hash, verbosity).await);
			}
			if let Some((from, to)) = hash_filter.range() {
				let range = self.get_block_range_by_hash(from, to, verbosity).await?;
				blocks.extend(range.into_iter().map(Some));
			}
			return Ok(blocks);
		}

		if let Some(num_filter) = &filter.num_filter {
			for number in num_filter.block_nums.iter().flatten() {
				blocks.push(self.get_block_by_number(*number, verbosity).await);
			}
			if let Some((from, to)) = num_filter.range() {
				let range = self.get_block_range_by_number(from, to, verbosity).await?;
				blocks.extend(range.into_iter().map(Some));
			}
		}

		Ok(blocks)
	}

	/// Resolves each transaction independently, keeping positions
	async fn get_txs_by_hash(&self, hashes: &[String]) -> Vec<Option<Value>>;

	/// Height of the elected node's best block
	async fn get_block_count(&self) -> Option<u64>;

	/// Opens a push subscription on `node`
	///
	/// # Arguments
	/// * `node` - Node whose notification endpoint is used
	///
	/// # Returns
	/// * `Result<NotificationStream, BlockChainError>` - A stream of raw
	///   references. Dropping or cancelling it closes the socket
	async fn subscribe(&self, node: &Node) -> Result<NotificationStream, BlockChainError>;

	/// Height carried by a resolved block payload
	fn block_number(&self, block: &Value) -> Option<u64>;

	/// Whether published blocks carry their number for gap backfill
	fn tracks_block_gaps(&self) -> bool;
}
