//! Domain models and data structures for the gateway.
//!
//! - `blockchain`: chain references, events, block filters and node status
//! - `config`: Configuration loading and validation
//! - `core`: Node and gateway configuration
//! - `security`: Secret values

mod blockchain;
mod config;
mod core;
mod security;

pub use blockchain::{
	BlockHashFilter, BlockNumFilter, BlocksFilter, BrokerMessage, ChainFamily, ChainReference,
	Event, EventData, EventKind, NodeInfo, SyncStatus,
};

pub use core::{
	BrokerConfig, CoordinationConfig, ExchangeKind, ExchangeTopology, GatewayConfig,
	IngestionConfig, Node, ScheduleConfig,
};

pub use config::{ConfigError, ConfigLoader, DEFAULT_CONFIG_PATH};

pub use security::{SecretString, SecretValue, SecurityError, SecurityResult};
