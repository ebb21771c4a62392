//! The storage collaborator the authoring side writes through.
//!
//! Calls are synchronous. A host that persists remotely can queue the work and return
//! immediately; the engine never waits on storage.

mod json_dir;
mod memory;

pub use json_dir::JsonDirStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::lesson::{Edge, LessonGraph, Node};

pub trait LessonStore {
    fn fetch_graph(&self, lesson_id: &str) -> Result<LessonGraph, StoreError>;

    /// Writes a whole lesson, creating it if needed.
    fn save_graph(&self, graph: &LessonGraph) -> Result<(), StoreError>;

    /// Inserts or replaces one node.
    fn persist_node(&self, lesson_id: &str, node: &Node) -> Result<(), StoreError>;

    fn delete_node(&self, lesson_id: &str, node_id: &str) -> Result<(), StoreError>;

    /// Inserts or replaces one edge.
    fn persist_edge(&self, lesson_id: &str, edge: &Edge) -> Result<(), StoreError>;

    fn delete_edge(&self, lesson_id: &str, edge_id: &str) -> Result<(), StoreError>;
}

fn upsert_node(graph: &mut LessonGraph, node: &Node) {
    match graph.node_mut(&node.id) {
        Some(existing) => *existing = node.clone(),
        None => graph.nodes.push(node.clone()),
    }
}

fn upsert_edge(graph: &mut LessonGraph, edge: &Edge) {
    match graph.edges.iter_mut().find(|e| e.id == edge.id) {
        Some(existing) => *existing = edge.clone(),
        None => graph.edges.push(edge.clone()),
    }
}
