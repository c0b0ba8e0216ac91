//! Test helper utilities
//!
//! - `builders`: Builders for test instances of models
//! - `http`: HTTP clients with a fast retry policy
//! - `store`: In-memory coordination store with TTL semantics

pub mod builders {
	pub mod gateway;
	pub mod node;

	pub use gateway::GatewayConfigBuilder;
	pub use node::NodeBuilder;
}


pub use builders::*;
pub use http::*;
pub use store::InMemoryCoordinationStore;
