//! Gateway lifecycle: scheduled jobs and the ingestion task.

mod error;
mod service;

pub use error::GatewayError;
pub use service::{GatewayComponents, GatewayService, JobSchedulerTrait};
