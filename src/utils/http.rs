//! HTTP client construction for node RPC traffic.
//!
//! Every JSON-RPC request to a node goes through a `reqwest` client wrapped in
//! `reqwest-middleware`, with transient failures retried by `reqwest-retry`.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
	default_on_request_failure, default_on_request_success, policies::ExponentialBackoff, Jitter,
	RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_attempts() -> u32 {
	3
}

fn default_initial_backoff() -> Duration {
	Duration::from_millis(250)
}

fn default_max_backoff() -> Duration {
	Duration::from_secs(10)
}

fn default_base_for_backoff() -> u32 {
	2
}

fn default_request_timeout() -> Duration {
	Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
	Duration::from_secs(10)
}

/// Serializable setting for jitter in retry policies
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
	/// No jitter applied to the backoff duration
	None,
	/// Full jitter applied, randomizing the backoff duration
	#[default]
	Full,
}

/// Retry and timeout policy for node RPC requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RetryConfig {
	/// Maximum number of retries for transient errors
	#[serde(default = "default_max_attempts")]
	pub max_retries: u32,
	/// Base duration for exponential backoff calculations
	#[serde(default = "default_base_for_backoff")]
	pub base_for_backoff: u32,
	/// Initial backoff duration before the first retry
	#[serde(default = "default_initial_backoff")]
	pub initial_backoff: Duration,
	/// Maximum backoff duration for retries
	#[serde(default = "default_max_backoff")]
	pub max_backoff: Duration,
	/// Jitter to apply to the backoff duration
	#[serde(default)]
	pub jitter: JitterSetting,
	/// Total time allowed for one request attempt
	#[serde(default = "default_request_timeout")]
	pub request_timeout: Duration,
	/// Time allowed to establish the TCP/TLS connection
	#[serde(default = "default_connect_timeout")]
	pub connect_timeout: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_attempts(),
			base_for_backoff: default_base_for_backoff(),
			initial_backoff: default_initial_backoff(),
			max_backoff: default_max_backoff(),
			jitter: JitterSetting::default(),
			request_timeout: default_request_timeout(),
			connect_timeout: default_connect_timeout(),
		}
	}
}

/// Retries connection failures and 5xx/429 responses, nothing else.
///
/// Bitcoin-family nodes answer RPC-level errors with HTTP 500 and a JSON body;
/// those are not transient, so a 500 that carries a JSON-RPC error is left to
/// the caller.
pub struct TransientErrorRetryStrategy;

impl RetryableStrategy for TransientErrorRetryStrategy {
	fn handle(
		&self,
		res: &Result<reqwest::Response, reqwest_middleware::Error>,
	) -> Option<Retryable> {
		match res {
			Ok(response) if response.status() == reqwest::StatusCode::INTERNAL_SERVER_ERROR => {
				let is_json = response
					.headers()
					.get(reqwest::header::CONTENT_TYPE)
					.and_then(|value| value.to_str().ok())
					.map(|value| value.contains("json"))
					.unwrap_or(false);
				if is_json {
					None
				} else {
					Some(Retryable::Transient)
				}
			}
			Ok(success) => default_on_request_success(success),
			Err(error) => default_on_request_failure(error),
		}
	}
}

/// Creates a retryable HTTP client
///
/// # Parameters:
/// - `config`: Configuration for retry policies
/// - `base_client`: The base HTTP client to use
/// - `custom_strategy`: Optional custom retry strategy, replacing the default one
pub fn create_retryable_http_client<S>(
	config: &RetryConfig,
	base_client: reqwest::Client,
	custom_strategy: Option<S>,
) -> ClientWithMiddleware
where
	S: RetryableStrategy + Send + Sync + 'static,
{
	let policy_builder = match config.jitter {
		JitterSetting::None => ExponentialBackoff::builder().jitter(Jitter::None),
		JitterSetting::Full => ExponentialBackoff::builder().jitter(Jitter::Full),
	};

	let retry_policy = policy_builder
		.base(config.base_for_backoff)
		.retry_bounds(config.initial_backoff, config.max_backoff)
		.build_with_max_retries(config.max_retries);

	if let Some(strategy) = custom_strategy {
		ClientBuilder::new(base_client).with(
			RetryTransientMiddleware::new_with_policy_and_strategy(retry_policy, strategy),
		)
	} else {
		ClientBuilder::new(base_client)
			.with(RetryTransientMiddleware::new_with_policy(retry_policy))
	}
	.build()
}

/// Creates the pooled client shared by all node transports
pub fn create_node_http_client(
	config: &RetryConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
	let base_client = reqwest::ClientBuilder::new()
		.pool_idle_timeout(Duration::from_secs(90))
		.pool_max_idle_per_host(32)
		.timeout(config.request_timeout)
		.connect_timeout(config.connect_timeout)
		.build()?;

	Ok(create_retryable_http_client(
		config,
		base_client,
		Some(TransientErrorRetryStrategy),
	))
}
