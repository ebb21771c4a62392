//! Graph mutations performed by the authoring surface.
//!
//! Every operation validates its result before applying it, so the graph an editor hands
//! out is always loadable by the traversal engine.

mod defaults;

use crate::config::{EditorConfig, OrphanPolicy};
use crate::error::{EditorError, PortError, ValidationError};
use crate::lesson::{Edge, LessonGraph, LessonMeta, Node, NodeKind, Port, PortKind};
use crate::ports::PortAllocator;
use crate::schema::{
    CORRECT_HANDLE, GraphWarning, INCORRECT_HANDLE, input_handle, normalize_handle,
    output_handle, validate_edge, validate_graph, validate_node,
};
use crate::store::LessonStore;
use defaults::default_node;
use std::sync::Arc;
use tracing::{debug, info};

pub struct LessonEditor {
    graph: LessonGraph,
    allocator: PortAllocator,
    config: EditorConfig,
    store: Option<Arc<dyn LessonStore>>,
}

impl LessonEditor {
    /// Starts an empty lesson.
    pub fn new(lesson: LessonMeta) -> Self {
        Self {
            graph: LessonGraph::new(lesson),
            allocator: PortAllocator::new(),
            config: EditorConfig::default(),
            store: None,
        }
    }

    /// Edits an existing graph. The graph must pass validation.
    pub fn from_graph(graph: LessonGraph) -> Result<Self, EditorError> {
        validate_graph(&graph)?;
        let mut allocator = PortAllocator::new();
        allocator.observe_graph(&graph);
        Ok(Self {
            graph,
            allocator,
            config: EditorConfig::default(),
            store: None,
        })
    }

    /// Loads a lesson from `store` and writes every later change back to it.
    pub fn open(store: Arc<dyn LessonStore>, lesson_id: &str) -> Result<Self, EditorError> {
        let graph = store.fetch_graph(lesson_id)?;
        info!(lesson = %lesson_id, nodes = graph.nodes.len(), "opened lesson for editing");
        Ok(Self::from_graph(graph)?.with_store(store))
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_allocator(mut self, mut allocator: PortAllocator) -> Self {
        allocator.observe_graph(&self.graph);
        self.allocator = allocator;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn LessonStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn graph(&self) -> &LessonGraph {
        &self.graph
    }

    pub fn into_graph(self) -> LessonGraph {
        self.graph
    }

    /// Tolerated inconsistencies in the current graph.
    pub fn warnings(&self) -> Result<Vec<GraphWarning>, EditorError> {
        Ok(validate_graph(&self.graph)?)
    }

    /// Writes the whole lesson to the store, if one is attached.
    pub fn save(&self) -> Result<(), EditorError> {
        if let Some(store) = &self.store {
            store.save_graph(&self.graph)?;
        }
        Ok(())
    }

    /// Appends a node of `kind` with its starter content and returns its id.
    pub fn add_node(&mut self, kind: NodeKind) -> Result<String, EditorError> {
        let id = self.allocator.node_id(kind, &self.graph);
        let node = default_node(id.clone(), kind, &mut self.allocator);
        validate_node(&node)?;
        self.persist_node(&node)?;
        debug!(node = %id, %kind, "added node");
        self.graph.nodes.push(node);
        Ok(id)
    }

    /// Applies `edit` to a copy of the node and keeps the result only if it validates.
    pub fn edit_node(
        &mut self,
        node_id: &str,
        edit: impl FnOnce(&mut Node),
    ) -> Result<(), EditorError> {
        let mut node = self.node(node_id)?.clone();
        edit(&mut node);
        if node.id != node_id {
            return Err(ValidationError::InvalidNode {
                node_id: node_id.to_string(),
                message: "node ids cannot be changed".to_string(),
            }
            .into());
        }
        validate_node(&node)?;
        self.replace_node(node)
    }

    pub fn set_label(&mut self, node_id: &str, label: &str) -> Result<(), EditorError> {
        self.edit_node(node_id, |node| node.label = label.to_string())
    }

    pub fn set_port_text(
        &mut self,
        node_id: &str,
        port_id: &str,
        text: &str,
    ) -> Result<(), EditorError> {
        let mut node = self.node(node_id)?.clone();
        let port = port_mut(&mut node, port_id)?;
        port.text = text.to_string();
        self.replace_node(node)
    }

    /// Marks a quiz answer as correct or incorrect.
    pub fn set_answer_correct(
        &mut self,
        node_id: &str,
        port_id: &str,
        correct: bool,
    ) -> Result<(), EditorError> {
        let mut node = self.node(node_id)?.clone();
        if node.kind() != NodeKind::Quiz {
            return Err(PortError::UnsupportedKind {
                node_id: node_id.to_string(),
                node_type: node.kind().to_string(),
                kind: "answer".to_string(),
            }
            .into());
        }
        port_mut(&mut node, port_id)?.correct = Some(correct);
        self.replace_node(node)
    }

    pub fn add_port(&mut self, node_id: &str, kind: PortKind) -> Result<String, EditorError> {
        let mut node = self.node(node_id)?.clone();
        let port_id = self.allocator.add_port(&mut node, kind)?;
        validate_node(&node)?;
        self.replace_node(node)?;
        Ok(port_id)
    }

    /// Removes a port and applies the configured orphan policy to the edges that
    /// referenced it. Returns the ids of the deleted edges.
    pub fn remove_port(&mut self, node_id: &str, port_id: &str) -> Result<Vec<String>, EditorError> {
        let position = self
            .graph
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| EditorError::NodeNotFound(node_id.to_string()))?;
        let mut node = self.graph.nodes[position].clone();
        let (kind, removed) = self.allocator.remove_port(&mut node, port_id)?;

        let referencing: Vec<String> = match kind {
            PortKind::Input => {
                let handle = input_handle(&removed.id);
                self.graph
                    .incoming_edges(node_id)
                    .filter(|e| normalize_handle(e.target_handle.as_deref()) == Some(handle.as_str()))
                    .map(|e| e.id.clone())
                    .collect()
            }
            // Quiz edges hang off the fixed correct/incorrect handles, not off answers.
            _ if node.kind() == NodeKind::Quiz => Vec::new(),
            _ => {
                let handle = output_handle(node.kind(), &removed.id);
                self.graph
                    .outgoing_edges(node_id)
                    .filter(|e| normalize_handle(e.source_handle.as_deref()) == Some(handle.as_str()))
                    .map(|e| e.id.clone())
                    .collect()
            }
        };

        let deleted = match self.config.orphan_policy {
            OrphanPolicy::Delete => referencing,
            OrphanPolicy::Keep => {
                if !referencing.is_empty() {
                    debug!(node = %node_id, port = %port_id, edges = referencing.len(), "kept orphaned edges");
                }
                Vec::new()
            }
        };

        // All store writes go first; the in-memory graph changes only once they succeed.
        if let Some(store) = &self.store {
            store.persist_node(&self.graph.lesson.id, &node)?;
            for edge_id in &deleted {
                store.delete_edge(&self.graph.lesson.id, edge_id)?;
            }
        }
        self.graph.edges.retain(|e| !deleted.contains(&e.id));
        self.graph.nodes[position] = node;
        Ok(deleted)
    }

    /// Connects `source` to `target` and returns the new edge id.
    ///
    /// `source_port` names the outgoing port to branch from; quizzes take `correct` or
    /// `incorrect` instead. `None` uses the source's unconditional exit.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: Option<&str>,
        target: &str,
    ) -> Result<String, EditorError> {
        let source_node = self.node(source)?;
        let target_handle = self.node(target)?.inputs.first().map(|p| input_handle(&p.id));

        let source_handle = match normalize_handle(source_port) {
            None => None,
            Some(port) if source_node.kind() == NodeKind::Quiz => {
                if port != CORRECT_HANDLE && port != INCORRECT_HANDLE {
                    return Err(PortError::PortNotFound {
                        node_id: source.to_string(),
                        port_id: port.to_string(),
                    }
                    .into());
                }
                Some(port.to_string())
            }
            Some(port) => {
                if !source_node.outgoing_ports().iter().any(|p| p.id == port) {
                    return Err(PortError::PortNotFound {
                        node_id: source.to_string(),
                        port_id: port.to_string(),
                    }
                    .into());
                }
                Some(output_handle(source_node.kind(), port))
            }
        };

        let duplicate = self.graph.outgoing_edges(source).any(|e| {
            e.target == target && normalize_handle(e.source_handle.as_deref()) == source_handle.as_deref()
        });
        if duplicate {
            return Err(EditorError::DuplicateEdge {
                source_id: source.to_string(),
                target_id: target.to_string(),
                handle: source_handle,
            });
        }

        let mut edge = Edge::new(self.allocator.edge_id(&self.graph), source, target);
        edge.source_handle = source_handle;
        edge.target_handle = target_handle;
        validate_edge(&edge, &self.graph)?;

        if let Some(store) = &self.store {
            store.persist_edge(&self.graph.lesson.id, &edge)?;
        }
        debug!(edge = %edge.id, %source, %target, handle = ?edge.source_handle, "connected");
        let id = edge.id.clone();
        self.graph.edges.push(edge);
        Ok(id)
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Result<Edge, EditorError> {
        let position = self
            .graph
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| EditorError::EdgeNotFound(edge_id.to_string()))?;
        if let Some(store) = &self.store {
            store.delete_edge(&self.graph.lesson.id, edge_id)?;
        }
        debug!(edge = %edge_id, "disconnected");
        Ok(self.graph.edges.remove(position))
    }

    /// Removes a node together with every edge that touches it.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, EditorError> {
        let position = self
            .graph
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| EditorError::NodeNotFound(node_id.to_string()))?;
        let touching: Vec<String> = self
            .graph
            .edges
            .iter()
            .filter(|e| e.source == node_id || e.target == node_id)
            .map(|e| e.id.clone())
            .collect();
        if let Some(store) = &self.store {
            for edge_id in &touching {
                store.delete_edge(&self.graph.lesson.id, edge_id)?;
            }
            store.delete_node(&self.graph.lesson.id, node_id)?;
        }
        self.graph.edges.retain(|e| !touching.contains(&e.id));
        debug!(node = %node_id, edges = touching.len(), "removed node");
        Ok(self.graph.nodes.remove(position))
    }

    fn node(&self, node_id: &str) -> Result<&Node, EditorError> {
        self.graph
            .node(node_id)
            .ok_or_else(|| EditorError::NodeNotFound(node_id.to_string()))
    }

    fn persist_node(&self, node: &Node) -> Result<(), EditorError> {
        if let Some(store) = &self.store {
            store.persist_node(&self.graph.lesson.id, node)?;
        }
        Ok(())
    }

    fn replace_node(&mut self, node: Node) -> Result<(), EditorError> {
        self.persist_node(&node)?;
        let slot = self
            .graph
            .node_mut(&node.id)
            .ok_or_else(|| EditorError::NodeNotFound(node.id.clone()))?;
        *slot = node;
        Ok(())
    }
}

fn port_mut<'n>(node: &'n mut Node, port_id: &str) -> Result<&'n mut Port, PortError> {
    let (kind, _) = node.find_port(port_id).ok_or_else(|| PortError::PortNotFound {
        node_id: node.id.clone(),
        port_id: port_id.to_string(),
    })?;
    let node_id = node.id.clone();
    node.ports_mut(kind)
        .and_then(|ports| ports.iter_mut().find(|p| p.id == port_id))
        .ok_or(PortError::PortNotFound {
            node_id,
            port_id: port_id.to_string(),
        })
}
