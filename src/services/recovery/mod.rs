//! Periodic recovery of missed and unresolved references.

mod sweeper;

pub use sweeper::{RecoverySweeper, SweepReport};
