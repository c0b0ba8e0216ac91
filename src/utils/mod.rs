//! Utility modules for common functionality.
//!
//! - cron_utils: Validation of the job cron schedules
//! - http: HTTP client utilities (i.e. creation of retryable HTTP clients)
//! - logging: Logging utilities
//! - metrics: Metrics utilities
//! - parsing: Parsing utilities
//! - tests: Test utilities

mod cron_utils;

pub mod http;
pub mod logging;
pub mod metrics;
pub mod parsing;
pub mod tests;

pub use cron_utils::*;
pub use http::*;
pub use parsing::*;
