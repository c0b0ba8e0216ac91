//! Coordination store interface and its Redis implementation.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Cmd, FromRedisValue};
use std::collections::HashMap;
use tracing::warn;

use crate::services::coordination::error::CoordinationError;

/// Key-value operations the gateway needs from the shared store.
///
/// Only locks and recovery markers live here; nothing is durable.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
	/// Sets `key` only if it does not exist (`SET key value NX EX ttl`)
	///
	/// # Arguments
	/// * `key` - Key to set
	/// * `value` - Value to store
	/// * `ttl_secs` - Expiry in seconds
	///
	/// # Returns
	/// * `Result<bool, CoordinationError>` - Whether this call set the key
	async fn set_nx_ex(
		&self,
		key: &str,
		value: &str,
		ttl_secs: u64,
	) -> Result<bool, CoordinationError>;

	/// `SET key value EX ttl`
	async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64)
		-> Result<(), CoordinationError>;

	/// `SET key value` without expiry
	async fn set(&self, key: &str, value: &str) -> Result<(), CoordinationError>;

	/// Reads `key`
	///
	/// # Returns
	/// * `Result<Option<String>, CoordinationError>` - The value, or `None` if
	///   the key is missing or expired
	async fn get(&self, key: &str) -> Result<Option<String>, CoordinationError>;

	/// Deletes every key in `keys`; an empty slice is a no-op
	async fn del(&self, keys: &[String]) -> Result<(), CoordinationError>;

	/// Lists keys matching a glob pattern
	///
	/// # Arguments
	/// * `pattern` - Glob such as `blk:*`
	///
	/// # Returns
	/// * `Result<Vec<String>, CoordinationError>` - Matching keys, in no order
	async fn keys(&self, pattern: &str) -> Result<Vec<String>, CoordinationError>;
}

/// Acquires an advisory lock.
///
/// A store failure counts as "not held", so the caller backs off.
pub async fn try_acquire_lock<S>(store: &S, key: &str, ttl_secs: u64) -> bool
where
	S: CoordinationStore + ?Sized,
{
	match store.set_nx_ex(key, "true", ttl_secs).await {
		Ok(acquired) => acquired,
		Err(e) => {
			warn!(key = %key, error = %e, "Lock store unavailable, treating lock as held");
			false
		}
	}
}

/// Redis-backed store over a multiplexed, self-reconnecting connection
#[derive(Clone)]
pub struct RedisCoordinationStore {
	connection: ConnectionManager,
}

impl RedisCoordinationStore {
	/// Connects to `url` (`redis://` or `rediss://`)
	pub async fn connect(url: &str) -> Result<Self, CoordinationError> {
		let client = redis::Client::open(url).map_err(|e| {
			CoordinationError::connection_error(
				"Invalid coordination store URL",
				Some(Box::new(e)),
				None,
			)
		})?;
		let connection = ConnectionManager::new(client).await.map_err(|e| {
			CoordinationError::connection_error(
				"Failed to connect to coordination store",
				Some(Box::new(e)),
				None,
			)
		})?;
		Ok(Self { connection })
	}

	async fn query<T: FromRedisValue>(&self, cmd: Cmd, key: &str) -> Result<T, CoordinationError> {
		let mut connection = self.connection.clone();
		cmd.query_async(&mut connection).await.map_err(|e| {
			CoordinationError::command_error(
				"Coordination store command failed",
				Some(Box::new(e)),
				Some(HashMap::from([("key".to_string(), key.to_string())])),
			)
		})
	}
}

#[async_trait]
impl CoordinationStore for RedisCoordinationStore {
	async fn set_nx_ex(
		&self,
		key: &str,
		value: &str,
		ttl_secs: u64,
	) -> Result<bool, CoordinationError> {
		let mut cmd = redis::cmd("SET");
		cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl_secs);
		let reply: Option<String> = self.query(cmd, key).await?;
		Ok(reply.is_some())
	}

	async fn set_ex(
		&self,
		key: &str,
		value: &str,
		ttl_secs: u64,
	) -> Result<(), CoordinationError> {
		let mut cmd = redis::cmd("SET");
		cmd.arg(key).arg(value).arg("EX").arg(ttl_secs);
		self.query(cmd, key).await
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), CoordinationError> {
		let mut cmd = redis::cmd("SET");
		cmd.arg(key).arg(value);
		self.query(cmd, key).await
	}

	async fn get(&self, key: &str) -> Result<Option<String>, CoordinationError> {
		let mut cmd = redis::cmd("GET");
		cmd.arg(key);
		self.query(cmd, key).await
	}

	async fn del(&self, keys: &[String]) -> Result<(), CoordinationError> {
		if keys.is_empty() {
			return Ok(());
		}
		let mut cmd = redis::cmd("DEL");
		for key in keys {
			cmd.arg(key);
		}
		self.query(cmd, &keys.join(",")).await
	}

	async fn keys(&self, pattern: &str) -> Result<Vec<String>, CoordinationError> {
		let mut cmd = redis::cmd("KEYS");
		cmd.arg(pattern);
		self.query(cmd, pattern).await
	}
}
