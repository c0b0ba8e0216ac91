//! Core services implementing the business logic.
//!
//! This module contains the main service implementations:
//! - `blockchain`: Chain adapters, transports and push subscriptions
//! - `coordination`: Shared locks and recovery markers
//! - `election`: Election of the authoritative node
//! - `gateway`: Scheduled jobs and the ingestion task
//! - `ingestion`: Subscription handling and per-reference processing
//! - `publisher`: Event publishing to the brokers
//! - `recovery`: Unresolved retry and gap backfill
//! - `rpc`: Query façade

pub mod blockchain;
pub mod coordination;
pub mod election;
pub mod gateway;
pub mod ingestion;
pub mod publisher;
pub mod recovery;
pub mod rpc;
