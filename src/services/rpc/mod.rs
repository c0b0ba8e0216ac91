//! Query façade over the chain adapter.
//!
//! This is the surface an API layer calls into: user-facing calls return
//! structured errors, lookups return `None` (or positional `None`s) for
//! unknown blocks and transactions.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

use crate::{
	models::{BlocksFilter, Node, NodeInfo},
	services::blockchain::{BlockChainError, ChainAdapter},
};

pub struct RpcService<A> {
	adapter: Arc<A>,
}

impl<A> Clone for RpcService<A> {
	fn clone(&self) -> Self {
		Self {
			adapter: self.adapter.clone(),
		}
	}
}

impl<A: ChainAdapter> RpcService<A> {
	pub fn new(adapter: Arc<A>) -> Self {
		Self { adapter }
	}

	pub fn blockchain(&self) -> String {
		self.adapter.blockchain()
	}

	pub async fn get_info(&self) -> Result<NodeInfo, BlockChainError> {
		self.adapter.get_info().await
	}

	#[instrument(skip(self, params))]
	pub async fn rpc_call(
		&self,
		id: Value,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		self.adapter.rpc_call(id, method, params).await
	}

	#[instrument(skip(self, params))]
	pub async fn contract_call(
		&self,
		contract: &str,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		self.adapter.contract_call(contract, method, params).await
	}

	pub async fn get_current_block(&self, verbosity: Option<u8>) -> Option<Value> {
		self.adapter.get_current_block(verbosity).await
	}

	pub async fn get_block_by_number(&self, number: u64, verbosity: Option<u8>) -> Option<Value> {
		self.adapter.get_block_by_number(number, verbosity).await
	}

	pub async fn get_block_by_hash(&self, hash: &str, verbosity: Option<u8>) -> Option<Value> {
		self.adapter.get_block_by_hash(hash, verbosity).await
	}

	pub async fn get_blocks(
		&self,
		filter: &BlocksFilter,
		verbosity: Option<u8>,
	) -> Result<Vec<Option<Value>>, BlockChainError> {
		self.adapter.get_blocks(filter, verbosity).await
	}

	pub async fn get_txs_by_hash(&self, hashes: &[String]) -> Vec<Option<Value>> {
		self.adapter.get_txs_by_hash(hashes).await
	}

	#[instrument(skip(self, raw_tx))]
	pub async fn send_signed_transaction(&self, raw_tx: &str) -> Result<Value, BlockChainError> {
		self.adapter.send_signed_transaction(raw_tx).await
	}

	/// Receiver that observes every change of the elected node
	pub fn elected_node_changes(&self) -> watch::Receiver<Option<Node>> {
		self.adapter.elected_node().subscribe()
	}
}
