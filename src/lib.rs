//! Blockchain node gateway.
//!
//! Keeps connections to a pool of redundant full nodes for one blockchain,
//! elects the authoritative node, mirrors its new blocks and transactions and
//! republishes them on AMQP brokers. It includes:
//!
//! - Configuration management through a JSON file
//! - Chain adapters for Bitcoin-family and Ethereum nodes
//! - Node election and push-notification ingestion with deduplication
//! - Recovery of unresolved references and missed blocks
//!
//! # Module Structure
//!
//! - `bootstrap`: Wires the gateway from its configuration
//! - `models`: Data structures for configuration and blockchain data
//! - `services`: Core business logic and node interaction
//! - `utils`: Common utilities and helper functions

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;
