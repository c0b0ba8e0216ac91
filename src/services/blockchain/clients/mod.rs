//! Chain adapter implementations.
//!
//! - Bitcoin family over JSON-RPC 1.0 and ZeroMQ
//! - Ethereum over JSON-RPC 2.0 and WebSocket

mod bitcoin {
	pub mod client;
}
mod ethereum {
	pub mod client;
}

pub use bitcoin::client::BitcoinClient;
pub use ethereum::client::EthereumClient;
