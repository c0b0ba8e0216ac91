//! Election of the authoritative node.

mod rule;
mod selector;

pub use rule::{choose_node, Election};
pub use selector::{NodeSelector, NodeSelectorTrait};
