use serde::{Deserialize, Serialize};

use crate::models::SecretValue;

/// An upstream node that can serve JSON-RPC and push notifications.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Node {
	/// Unique name of the node, used in logs and metrics
	pub name: String,

	/// Host label; together with `notification_url` it identifies a subscription target
	pub host: String,

	/// JSON-RPC endpoint (http:// or https://)
	pub rpc_url: SecretValue,

	/// Push endpoint: `tcp://` (ZeroMQ) for bitcoin nodes, `ws(s)://` for ethereum nodes
	pub notification_url: String,

	/// Basic-auth user for the RPC endpoint
	#[serde(default)]
	pub username: Option<SecretValue>,

	/// Basic-auth password for the RPC endpoint
	#[serde(default)]
	pub password: Option<SecretValue>,
}

impl Node {
	/// Returns `(user, password)` when a username is configured
	pub fn credentials(&self) -> Option<(&str, &str)> {
		self.username.as_ref().map(|user| {
			(
				user.as_str(),
				self.password.as_ref().map(|p| p.as_str()).unwrap_or(""),
			)
		})
	}

	/// Two nodes are the same subscription target when host and push endpoint match.
	pub fn same_target(&self, other: &Node) -> bool {
		self.host == other.host && self.notification_url == other.notification_url
	}
}
