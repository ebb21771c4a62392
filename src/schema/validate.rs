use super::handle::{defines_source_handle, defines_target_handle};
use crate::error::ValidationError;
use crate::lesson::{Edge, LessonGraph, Node, NodeContent, NodeKind};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use std::fmt;

/// A non-fatal finding about a graph that is structurally valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphWarning {
    /// The edge's source handle no longer names a port on its source node.
    OrphanEdge {
        edge_id: String,
        node_id: String,
        handle: String,
    },
    /// Several outgoing edges of one node share a source handle.
    DuplicateHandle {
        node_id: String,
        handle: Option<String>,
        edge_ids: Vec<String>,
    },
    /// A branching node has more outgoing edges than declared options.
    ExcessEdges {
        node_id: String,
        options: usize,
        edges: usize,
    },
    /// Zero or several nodes have no incoming edges; traversal starts at the first node.
    AmbiguousEntry { candidates: Vec<String> },
}

impl fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphWarning::OrphanEdge {
                edge_id,
                node_id,
                handle,
            } => write!(
                f,
                "edge '{}' is orphaned: node '{}' has no handle '{}'",
                edge_id, node_id, handle
            ),
            GraphWarning::DuplicateHandle {
                node_id,
                handle,
                edge_ids,
            } => write!(
                f,
                "node '{}' has {} edges on handle {}: {}",
                node_id,
                edge_ids.len(),
                handle.as_deref().unwrap_or("<default>"),
                edge_ids.join(", ")
            ),
            GraphWarning::ExcessEdges {
                node_id,
                options,
                edges,
            } => write!(
                f,
                "node '{}' declares {} options but has {} outgoing edges",
                node_id, options, edges
            ),
            GraphWarning::AmbiguousEntry { candidates } if candidates.is_empty() => {
                write!(f, "no node is free of incoming edges; the first node is the entry")
            }
            GraphWarning::AmbiguousEntry { candidates } => write!(
                f,
                "{} candidate entry nodes ({}); the first node is the entry",
                candidates.len(),
                candidates.join(", ")
            ),
        }
    }
}

/// Validates a single node record.
pub fn validate_node(node: &Node) -> Result<(), ValidationError> {
    if node.id.trim().is_empty() {
        return Err(ValidationError::MissingField {
            record: "node".to_string(),
            field: "id".to_string(),
        });
    }
    if node.label.trim().is_empty() {
        return Err(ValidationError::MissingField {
            record: format!("node '{}'", node.id),
            field: "label".to_string(),
        });
    }

    let mut seen = AHashSet::new();
    for (_, port) in node.all_ports() {
        if port.id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: format!("port on node '{}'", node.id),
                field: "id".to_string(),
            });
        }
        if !seen.insert(port.id.as_str()) {
            return Err(ValidationError::DuplicatePortId {
                node_id: node.id.clone(),
                port_id: port.id.clone(),
            });
        }
    }

    match &node.content {
        NodeContent::Activity(data) => match data.configuration_value() {
            Ok(value) if value.is_object() => {}
            Ok(_) => {
                return Err(invalid(node, "activity configuration must be a JSON object"));
            }
            Err(e) => {
                return Err(invalid(
                    node,
                    &format!("activity configuration is not valid JSON: {}", e),
                ));
            }
        },
        NodeContent::Start(data) if data.outputs.len() > 1 => {
            return Err(invalid(node, "a start node has at most one output"));
        }
        _ => {}
    }

    Ok(())
}

/// Validates an edge against the graph it belongs to.
pub fn validate_edge(edge: &Edge, graph: &LessonGraph) -> Result<(), ValidationError> {
    if edge.id.trim().is_empty() {
        return Err(ValidationError::MissingField {
            record: "edge".to_string(),
            field: "id".to_string(),
        });
    }
    let source = find_endpoint(graph, edge, &edge.source)?;
    let target = find_endpoint(graph, edge, &edge.target)?;

    if source.kind() == NodeKind::End {
        return Err(invalid(source, "an end node cannot have outgoing edges"));
    }
    if let Some(handle) = &edge.source_handle {
        if !defines_source_handle(source, handle) {
            return Err(ValidationError::UnknownHandle {
                edge_id: edge.id.clone(),
                node_id: source.id.clone(),
                handle: handle.clone(),
            });
        }
    }
    if let Some(handle) = &edge.target_handle {
        if !defines_target_handle(target, handle) {
            return Err(ValidationError::UnknownHandle {
                edge_id: edge.id.clone(),
                node_id: target.id.clone(),
                handle: handle.clone(),
            });
        }
    }
    Ok(())
}

/// Validates a whole graph as loaded from storage.
///
/// Structural errors fail the call. Handle mismatches on existing edges are tolerated
/// because traversal falls through them, so they come back as warnings instead.
pub fn validate_graph(graph: &LessonGraph) -> Result<Vec<GraphWarning>, ValidationError> {
    if let Some(id) = graph.nodes.iter().map(|n| &n.id).duplicates().next() {
        return Err(ValidationError::DuplicateNodeId(id.clone()));
    }
    if let Some(id) = graph.edges.iter().map(|e| &e.id).duplicates().next() {
        return Err(ValidationError::DuplicateEdgeId(id.clone()));
    }
    for node in &graph.nodes {
        validate_node(node)?;
    }

    let mut warnings = Vec::new();
    let mut by_source: AHashMap<&str, Vec<&Edge>> = AHashMap::new();
    for edge in &graph.edges {
        if edge.id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: "edge".to_string(),
                field: "id".to_string(),
            });
        }
        let source = find_endpoint(graph, edge, &edge.source)?;
        find_endpoint(graph, edge, &edge.target)?;

        if let Some(handle) = &edge.source_handle {
            if !defines_source_handle(source, handle) {
                warnings.push(GraphWarning::OrphanEdge {
                    edge_id: edge.id.clone(),
                    node_id: source.id.clone(),
                    handle: handle.clone(),
                });
            }
        }
        by_source.entry(edge.source.as_str()).or_default().push(edge);
    }

    // Walk nodes in authored order so warnings come out deterministically.
    for node in &graph.nodes {
        let Some(edges) = by_source.get(node.id.as_str()) else {
            continue;
        };
        for handle in edges.iter().map(|e| &e.source_handle).duplicates() {
            warnings.push(GraphWarning::DuplicateHandle {
                node_id: node.id.clone(),
                handle: handle.clone(),
                edge_ids: edges
                    .iter()
                    .filter(|e| &e.source_handle == handle)
                    .map(|e| e.id.clone())
                    .collect(),
            });
        }
        if node.kind().is_branching() {
            let options = match node.kind() {
                NodeKind::Quiz => 2,
                _ => node.outgoing_ports().len(),
            };
            if edges.len() > options {
                warnings.push(GraphWarning::ExcessEdges {
                    node_id: node.id.clone(),
                    options,
                    edges: edges.len(),
                });
            }
        }
    }

    let candidates = graph.entry_candidates();
    if !graph.is_empty() && candidates.len() != 1 {
        warnings.push(GraphWarning::AmbiguousEntry {
            candidates: candidates.iter().map(|n| n.id.clone()).collect(),
        });
    }

    Ok(warnings)
}

fn find_endpoint<'g>(
    graph: &'g LessonGraph,
    edge: &Edge,
    node_id: &str,
) -> Result<&'g Node, ValidationError> {
    graph
        .node(node_id)
        .ok_or_else(|| ValidationError::DanglingReference {
            edge_id: edge.id.clone(),
            missing_node_id: node_id.to_string(),
        })
}

fn invalid(node: &Node, message: &str) -> ValidationError {
    ValidationError::InvalidNode {
        node_id: node.id.clone(),
        message: message.to_string(),
    }
}
