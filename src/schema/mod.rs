//! Structural rules of the lesson graph: handle strings and record validation.

pub mod handle;
mod validate;

pub use handle::*;
pub use validate::{GraphWarning, validate_edge, validate_graph, validate_node};
