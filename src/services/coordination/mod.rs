//! Cross-instance coordination.
//!
//! Advisory locks, unresolved-reference markers, the gap skip-list and the
//! last-published-block marker, all kept in a shared key-value store.

mod error;
pub mod keys;
mod store;

pub use error::CoordinationError;
pub use store::{try_acquire_lock, CoordinationStore, RedisCoordinationStore};
