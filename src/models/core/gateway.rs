use serde::{Deserialize, Serialize};

use crate::{
	models::{ChainFamily, Node, SecretValue},
	utils::RetryConfig,
};

/// Configuration of one gateway instance.
///
/// One instance serves one blockchain and elects among the listed nodes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
	/// Name of the blockchain, used as `blockchain` in published events (e.g. "BITCOIN")
	pub blockchain: String,

	/// Protocol family of the nodes
	pub chain_family: ChainFamily,

	/// Candidate nodes, in election order
	pub nodes: Vec<Node>,

	/// Shared store used for locks, markers and gap entries
	pub coordination: CoordinationConfig,

	#[serde(default)]
	pub broker: BrokerConfig,

	#[serde(default)]
	pub schedules: ScheduleConfig,

	#[serde(default)]
	pub ingestion: IngestionConfig,

	/// Chains whose `getblock` only accepts the block hash
	#[serde(default = "default_hash_only_getblock")]
	pub hash_only_getblock: Vec<String>,

	/// Retry and timeout policy for node RPC requests
	#[serde(default)]
	pub rpc_retry: RetryConfig,
}

fn default_hash_only_getblock() -> Vec<String> {
	vec![
		"DOGECOIN".to_string(),
		"EMERCOIN".to_string(),
		"DASHCOIN".to_string(),
	]
}

impl GatewayConfig {
	/// Whether `getblock` for this chain must be sent without a verbosity argument
	pub fn hash_only_getblock(&self) -> bool {
		self.hash_only_getblock
			.iter()
			.any(|chain| chain.eq_ignore_ascii_case(&self.blockchain))
	}
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CoordinationConfig {
	/// Redis connection URL
	pub url: SecretValue,
}

/// AMQP exchange type
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
	#[default]
	Fanout,
	Direct,
	Topic,
	Headers,
}

/// Exchange and queues declared on one broker connection
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExchangeTopology {
	pub exchange: String,

	#[serde(default)]
	pub exchange_kind: ExchangeKind,

	/// Queues declared and bound to the exchange with an empty routing key
	#[serde(default)]
	pub queues: Vec<String>,

	#[serde(default = "default_true")]
	pub durable: bool,

	#[serde(default = "default_prefetch_count")]
	pub prefetch_count: u16,

	/// Apply the prefetch limit to the whole channel
	#[serde(default = "default_true")]
	pub global_prefetch: bool,
}

fn default_true() -> bool {
	true
}

fn default_prefetch_count() -> u16 {
	1
}

impl ExchangeTopology {
	pub fn new(exchange: &str, queues: &[&str]) -> Self {
		Self {
			exchange: exchange.to_string(),
			exchange_kind: ExchangeKind::Fanout,
			queues: queues.iter().map(|q| q.to_string()).collect(),
			durable: true,
			prefetch_count: default_prefetch_count(),
			global_prefetch: true,
		}
	}
}

/// Broker connections. The ledger broker is optional; without a wallet broker
/// events are logged and dropped.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
	#[serde(default)]
	pub ledger_url: Option<SecretValue>,

	#[serde(default)]
	pub wallet_url: Option<SecretValue>,

	#[serde(default = "default_ledger_topology")]
	pub ledger: ExchangeTopology,

	#[serde(default = "default_wallet_topology")]
	pub wallet: ExchangeTopology,

	#[serde(default = "default_heartbeat_secs")]
	pub heartbeat_secs: u16,

	#[serde(default = "default_reconnect_delay_ms")]
	pub reconnect_delay_ms: u64,

	#[serde(default = "default_reconnect_lock_ttl_secs")]
	pub reconnect_lock_ttl_secs: u64,
}

fn default_ledger_topology() -> ExchangeTopology {
	ExchangeTopology::new("rpc", &["db"])
}

fn default_wallet_topology() -> ExchangeTopology {
	ExchangeTopology::new("walletXch", &["wallet"])
}

fn default_heartbeat_secs() -> u16 {
	15
}

fn default_reconnect_delay_ms() -> u64 {
	5_000
}

fn default_reconnect_lock_ttl_secs() -> u64 {
	600
}

impl Default for BrokerConfig {
	fn default() -> Self {
		Self {
			ledger_url: None,
			wallet_url: None,
			ledger: default_ledger_topology(),
			wallet: default_wallet_topology(),
			heartbeat_secs: default_heartbeat_secs(),
			reconnect_delay_ms: default_reconnect_delay_ms(),
			reconnect_lock_ttl_secs: default_reconnect_lock_ttl_secs(),
		}
	}
}

/// Cron expressions (with seconds) for the periodic jobs
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
	#[serde(default = "default_node_selection")]
	pub node_selection: String,

	#[serde(default = "default_unresolved_retry")]
	pub unresolved_retry: String,

	#[serde(default = "default_gap_backfill")]
	pub gap_backfill: String,
}

fn default_node_selection() -> String {
	"*/30 * * * * *".to_string()
}

fn default_unresolved_retry() -> String {
	"0 * * * * *".to_string()
}

fn default_gap_backfill() -> String {
	"30 * * * * *".to_string()
}

impl Default for ScheduleConfig {
	fn default() -> Self {
		Self {
			node_selection: default_node_selection(),
			unresolved_retry: default_unresolved_retry(),
			gap_backfill: default_gap_backfill(),
		}
	}
}

/// Dedup and recovery settings for the ingestion path
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct IngestionConfig {
	#[serde(default = "default_tx_lock_ttl_secs")]
	pub tx_lock_ttl_secs: u64,

	#[serde(default = "default_block_lock_ttl_secs")]
	pub block_lock_ttl_secs: u64,

	#[serde(default = "default_unresolved_ttl_secs")]
	pub unresolved_ttl_secs: u64,

	#[serde(default)]
	pub disable_tx_lock: bool,

	#[serde(default)]
	pub disable_block_lock: bool,

	/// Record skipped block numbers after every (re)subscription
	#[serde(default)]
	pub check_missed_blocks: bool,
}

fn default_tx_lock_ttl_secs() -> u64 {
	90
}

fn default_block_lock_ttl_secs() -> u64 {
	300
}

fn default_unresolved_ttl_secs() -> u64 {
	900
}

impl Default for IngestionConfig {
	fn default() -> Self {
		Self {
			tx_lock_ttl_secs: default_tx_lock_ttl_secs(),
			block_lock_ttl_secs: default_block_lock_ttl_secs(),
			unresolved_ttl_secs: default_unresolved_ttl_secs(),
			disable_tx_lock: false,
			disable_block_lock: false,
			check_missed_blocks: false,
		}
	}
}
