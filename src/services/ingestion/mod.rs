//! Push ingestion: subscription management and per-reference handling.

mod listener;
mod resolve;

pub use listener::{IngestionListener, ReferenceOutcome, RESUBSCRIBE_DELAY};
pub use resolve::resolve_reference;
