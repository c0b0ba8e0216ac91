//! Core domain models for the gateway.
//!
//! - Node: an upstream blockchain node the gateway can route to and subscribe on
//! - GatewayConfig: everything one gateway instance needs to run

mod gateway;
mod node;

pub use gateway::{
	BrokerConfig, CoordinationConfig, ExchangeKind, ExchangeTopology, GatewayConfig,
	IngestionConfig, ScheduleConfig,
};
pub use node::Node;
