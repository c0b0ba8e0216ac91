//! Gateway service error types and handling.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors while running the gateway jobs
#[derive(ThisError, Debug)]
pub enum GatewayError {
	/// Creating, adding or running scheduled jobs failed
	#[error("Scheduler error: {0}")]
	SchedulerError(ErrorContext),

	/// Building the gateway components failed
	#[error("Initialization error: {0}")]
	InitializationError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl GatewayError {
	// Scheduler error
	pub fn scheduler_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SchedulerError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Initialization error
	pub fn initialization_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InitializationError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for GatewayError {
	fn trace_id(&self) -> String {
		match self {
			Self::SchedulerError(ctx) => ctx.trace_id.clone(),
			Self::InitializationError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
