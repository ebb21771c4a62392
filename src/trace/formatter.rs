use crate::engine::{Step, Transition};
use crate::lesson::LessonGraph;

/// Formats traversal results into human-readable strings.
pub struct PathFormatter;

impl PathFormatter {
    /// Renders a visited path as `Label (id) -> Label (id)`.
    ///
    /// Ids missing from the graph are rendered as `? (id)` so that a stale history is
    /// still readable.
    pub fn format_history(graph: &LessonGraph, history: &[String]) -> String {
        history
            .iter()
            .map(|id| Self::format_node(graph, id))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Renders one step, including the rule that picked the edge.
    pub fn format_step(step: &Step) -> String {
        match step {
            Step::Moved(Transition {
                from,
                to,
                edge_id,
                rule,
            }) => format!("{} -> {} via '{}' ({})", from, to, edge_id, rule),
            Step::NoPath { at } => format!("{}: no path, lesson ends here", at),
        }
    }

    fn format_node(graph: &LessonGraph, node_id: &str) -> String {
        match graph.node(node_id) {
            Some(node) if !node.label.is_empty() => format!("{} ({})", node.label, node.id),
            Some(node) => format!("{} ({})", node.kind(), node.id),
            None => format!("? ({})", node_id),
        }
    }
}
