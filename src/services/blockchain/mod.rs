//! Blockchain node access.
//!
//! Provides the chain adapter abstraction and its implementations:
//!
//! - The [`ChainAdapter`] trait and the Bitcoin and Ethereum clients
//! - JSON-RPC transports and request routing to the elected node
//! - Push notification subscriptions (ZeroMQ and WebSocket)
//! - Error handling for node operations

mod adapter;
mod clients;
mod elected;
mod error;
mod notifications;
mod router;
mod transports;

pub use adapter::{ChainAdapter, DEFAULT_VERBOSITY};
pub use clients::{BitcoinClient, EthereumClient};
pub use elected::ElectedNode;
pub use error::BlockChainError;
pub use notifications::{
	subscribe_websocket, subscribe_zmq, NotificationItem, NotificationStream, NOTIFICATION_BUFFER,
};
pub use router::NodeRouter;
pub use transports::{HttpTransportClient, JsonRpcVersion, NodeTransport, TransportError};
