use crate::lesson::{Node, NodeKind, Port};

/// Handle a quiz emits when the learner answered correctly.
pub const CORRECT_HANDLE: &str = "correct";
/// Handle a quiz emits when the learner answered incorrectly.
pub const INCORRECT_HANDLE: &str = "incorrect";

const OUT_SEPARATOR: &str = "-out-";
const INPUT_PREFIX: &str = "in-";

/// Builds the source handle for an outgoing port: `{nodeType}-out-{portId}`.
pub fn output_handle(kind: NodeKind, port_id: &str) -> String {
    format!("{}{}{}", kind.as_str(), OUT_SEPARATOR, port_id)
}

/// Builds the target handle for an input port: `in-{portId}`.
pub fn input_handle(port_id: &str) -> String {
    format!("{}{}", INPUT_PREFIX, port_id)
}

pub fn quiz_handle(correct: bool) -> &'static str {
    if correct {
        CORRECT_HANDLE
    } else {
        INCORRECT_HANDLE
    }
}

/// Every source handle the node currently defines, in port order.
pub fn source_handles(node: &Node) -> Vec<String> {
    match node.kind() {
        NodeKind::Quiz => vec![CORRECT_HANDLE.to_string(), INCORRECT_HANDLE.to_string()],
        NodeKind::End => Vec::new(),
        kind => node
            .outgoing_ports()
            .iter()
            .map(|p| output_handle(kind, &p.id))
            .collect(),
    }
}

pub fn defines_source_handle(node: &Node, handle: &str) -> bool {
    match node.kind() {
        NodeKind::Quiz => handle == CORRECT_HANDLE || handle == INCORRECT_HANDLE,
        _ => port_for_source_handle(node, handle).is_some(),
    }
}

/// Resolves an `{nodeType}-out-{portId}` handle back to the port it names.
pub fn port_for_source_handle<'a>(node: &'a Node, handle: &str) -> Option<&'a Port> {
    let port_id = handle
        .strip_prefix(node.kind().as_str())?
        .strip_prefix(OUT_SEPARATOR)?;
    node.outgoing_ports().iter().find(|p| p.id == port_id)
}

pub fn defines_target_handle(node: &Node, handle: &str) -> bool {
    handle
        .strip_prefix(INPUT_PREFIX)
        .is_some_and(|port_id| node.inputs.iter().any(|p| p.id == port_id))
}

/// Handles are stored loosely; blank strings mean "no handle".
pub fn normalize_handle(handle: Option<&str>) -> Option<&str> {
    handle.map(str::trim).filter(|h| !h.is_empty())
}
