//! Helpers for the cron expressions that drive election and recovery jobs.

use cron::Schedule;
use std::str::FromStr;

/// Parses a cron expression, returning the parser message on failure
pub fn validate_cron_schedule(cron_schedule: &str) -> Result<(), String> {
	Schedule::from_str(cron_schedule)
		.map(|_| ())
		.map_err(|e| format!("invalid cron expression '{}': {}", cron_schedule, e))
}
