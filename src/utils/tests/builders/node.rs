//! Test helper utilities for Node configuration
//!
//! - `NodeBuilder`: Builder for creating test Node instances

use crate::models::{Node, SecretValue};

/// Builder for creating test Node instances
pub struct NodeBuilder {
	name: String,
	host: String,
	rpc_url: SecretValue,
	notification_url: String,
	username: Option<SecretValue>,
	password: Option<SecretValue>,
}

impl Default for NodeBuilder {
	fn default() -> Self {
		Self {
			name: "node-1".to_string(),
			host: "127.0.0.1".to_string(),
			rpc_url: SecretValue::plain("http://127.0.0.1:8332"),
			notification_url: "tcp://127.0.0.1:28332".to_string(),
			username: None,
			password: None,
		}
	}
}

impl NodeBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn name(mut self, name: &str) -> Self {
		self.name = name.to_string();
		self
	}

	pub fn host(mut self, host: &str) -> Self {
		self.host = host.to_string();
		self
	}

	pub fn rpc_url(mut self, url: &str) -> Self {
		self.rpc_url = SecretValue::plain(url);
		self
	}

	pub fn notification_url(mut self, url: &str) -> Self {
		self.notification_url = url.to_string();
		self
	}

	pub fn credentials(mut self, username: &str, password: &str) -> Self {
		self.username = Some(SecretValue::plain(username));
		self.password = Some(SecretValue::plain(password));
		self
	}

	pub fn build(self) -> Node {
		Node {
			name: self.name,
			host: self.host,
			rpc_url: self.rpc_url,
			notification_url: self.notification_url,
			username: self.username,
			password: self.password,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_node() {
		let node = NodeBuilder::new().build();
		assert_eq!(node.name, "node-1");
		assert_eq!(node.rpc_url.as_str(), "http://127.0.0.1:8332");
		assert!(node.username.is_none());
	}

	#[test]
	fn test_all_fields() {
		let node = NodeBuilder::new()
			.name("geth-2")
			.host("10.1.0.2")
			.rpc_url("https://10.1.0.2:8545")
			.notification_url("wss://10.1.0.2:8546")
			.credentials("user", "pass")
			.build();

		assert_eq!(node.name, "geth-2");
		assert_eq!(node.host, "10.1.0.2");
		assert_eq!(node.notification_url, "wss://10.1.0.2:8546");
		assert_eq!(node.credentials(), Some(("user", "pass")));
	}
}
