use super::allocator::PortAllocator;
use crate::lesson::NodeKind;
use crate::record::{NodeRecord, PortRecord};
use ahash::AHashSet;
use tracing::debug;

/// Upgrades a node's legacy port layout in place. Returns `true` if anything changed.
///
/// - bare-string options, outputs, inputs and answers become `{id, text}` records with
///   fresh ids, keeping their order;
/// - a legacy quiz (`options` + `correctAnswer`) becomes `answers` with correctness flags;
/// - a node without an input collection gets one input (start nodes excepted).
///
/// Running it again on a migrated node changes nothing.
pub fn migrate_legacy_ports(node: &mut NodeRecord, allocator: &mut PortAllocator) -> bool {
    let kind = node.node_type.parse::<NodeKind>().ok();
    let mut taken: AHashSet<String> = [
        &node.data.inputs,
        &node.data.outputs,
        &node.data.options,
        &node.data.answers,
    ]
    .into_iter()
    .flatten()
    .flatten()
    .filter_map(|p| p.id().map(str::to_string))
    .collect();
    let mut changed = false;

    if kind == Some(NodeKind::Quiz) && node.data.answers.is_none() {
        if let Some(options) = node.data.options.take() {
            let correct_answer = node.data.correct_answer.take();
            let answers = options
                .into_iter()
                .map(|port| match port {
                    PortRecord::Legacy(text) => PortRecord::Port {
                        id: fresh_id(allocator, &mut taken),
                        correct: Some(correct_answer.as_deref() == Some(text.as_str())),
                        text,
                    },
                    PortRecord::Port { id, text, correct } => PortRecord::Port {
                        correct: correct
                            .or_else(|| Some(correct_answer.as_deref() == Some(text.as_str()))),
                        id,
                        text,
                    },
                })
                .collect();
            node.data.answers = Some(answers);
            changed = true;
        }
    }

    for ports in [
        &mut node.data.inputs,
        &mut node.data.outputs,
        &mut node.data.options,
        &mut node.data.answers,
    ]
    .into_iter()
    .flatten()
    {
        for port in ports.iter_mut().filter(|p| p.is_legacy()) {
            if let PortRecord::Legacy(text) = port {
                let text = std::mem::take(text);
                *port = PortRecord::Port {
                    id: fresh_id(allocator, &mut taken),
                    text,
                    correct: None,
                };
                changed = true;
            }
        }
    }

    if node.data.inputs.is_none() && kind != Some(NodeKind::Start) {
        node.data.inputs = Some(vec![PortRecord::Port {
            id: fresh_id(allocator, &mut taken),
            text: String::new(),
            correct: None,
        }]);
        changed = true;
    }

    if changed {
        debug!(node = %node.id, "migrated legacy ports");
    }
    changed
}

fn fresh_id(allocator: &mut PortAllocator, taken: &mut AHashSet<String>) -> String {
    let id = allocator.generate_id(|candidate| taken.contains(candidate));
    taken.insert(id.clone());
    id
}
