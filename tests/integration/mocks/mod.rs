//! Mock implementations for testing purposes.
//!
//! This module contains mock implementations of the gateway seams, primarily
//! for testing. It includes:
//! - Node transports (a `mockall` mock and an in-memory chain)
//! - Broker connectors that count what they open and publish
//! - Chain adapter, publisher, store, selector and scheduler mocks
//!
//! The mocks are implemented using the `mockall` crate.

mod transports;

#[allow(unused_imports)]
pub use brokers::*;
#[allow(unused_imports)]
pub use services::*;
#[allow(unused_imports)]
pub use transports::*;
