use super::{EdgeRecord, LessonRecord, NodeRecord, PortRecord};
use crate::lesson::{CURRENT_SCHEMA_VERSION, NodeKind, PortKind};
use crate::ports::{PortAllocator, migrate_legacy_ports};
use crate::schema::output_handle;
use ahash::{AHashMap, AHashSet};
use tracing::info;

/// What a schema upgrade changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    pub from_version: u32,
    pub migrated_nodes: usize,
    pub rewritten_handles: usize,
    pub assigned_edge_ids: usize,
}

impl UpgradeReport {
    pub fn is_noop(&self) -> bool {
        self.migrated_nodes == 0 && self.rewritten_handles == 0 && self.assigned_edge_ids == 0
    }
}

/// Brings a persisted lesson up to [`CURRENT_SCHEMA_VERSION`].
///
/// Runs once at load time. Legacy ports get stable ids, and edges that addressed a branch
/// by option position (`choice-{index}-{slug}`, `game-outcome-{index}-{slug}`) or by a
/// bare `out-{portId}` are rewritten to the `{nodeType}-out-{portId}` form. Edges without
/// an id get one. Upgrading an up-to-date record is a no-op.
pub fn upgrade(record: &mut LessonRecord, allocator: &mut PortAllocator) -> UpgradeReport {
    let mut report = UpgradeReport {
        from_version: record.schema_version,
        ..Default::default()
    };

    for node in &mut record.nodes {
        if migrate_legacy_ports(node, allocator) {
            report.migrated_nodes += 1;
        }
    }

    let nodes: AHashMap<&str, &NodeRecord> =
        record.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    for edge in &mut record.edges {
        let Some(source) = nodes.get(edge.source.as_str()) else {
            continue;
        };
        if let Some(rewritten) = rewrite_legacy_handle(source, edge) {
            edge.source_handle = Some(rewritten);
            report.rewritten_handles += 1;
        }
    }

    let mut edge_ids: AHashSet<String> = record
        .edges
        .iter()
        .filter(|e| !e.id.is_empty())
        .map(|e| e.id.clone())
        .collect();
    for edge in record.edges.iter_mut().filter(|e| e.id.is_empty()) {
        edge.id = allocator.generate_id(|id| edge_ids.contains(&format!("edge-{}", id)));
        edge.id.insert_str(0, "edge-");
        edge_ids.insert(edge.id.clone());
        report.assigned_edge_ids += 1;
    }

    if record.schema_version < CURRENT_SCHEMA_VERSION || !report.is_noop() {
        info!(
            lesson = %record.lesson.id,
            from = report.from_version,
            to = CURRENT_SCHEMA_VERSION,
            migrated_nodes = report.migrated_nodes,
            rewritten_handles = report.rewritten_handles,
            "upgraded lesson record"
        );
    }
    record.schema_version = record.schema_version.max(CURRENT_SCHEMA_VERSION);
    report
}

fn rewrite_legacy_handle(source: &NodeRecord, edge: &EdgeRecord) -> Option<String> {
    let handle = edge.source_handle.as_deref()?;
    let kind = source.node_type.parse::<NodeKind>().ok()?;
    let outgoing = match kind.outgoing_port_kind()? {
        PortKind::Output => source.data.outputs.as_ref()?,
        _ => source.data.options.as_ref()?,
    };
    let port_ids: Vec<&str> = outgoing.iter().filter_map(PortRecord::id).collect();

    let current_prefix = format!("{}-out-", kind.as_str());
    if handle.starts_with(&current_prefix) {
        return None;
    }

    let port_id = if let Some(id) = handle.strip_prefix("out-") {
        port_ids.iter().find(|p| **p == id).copied()
    } else {
        let rest = match kind {
            NodeKind::Choice => handle.strip_prefix("choice-"),
            NodeKind::Activity => handle.strip_prefix("game-outcome-"),
            _ => None,
        }?;
        if let Some(id) = port_ids.iter().find(|p| **p == rest) {
            // `game-outcome-{portId}`, written by activities that already knew port ids.
            Some(*id)
        } else {
            let index: usize = rest.split('-').next()?.parse().ok()?;
            port_ids.get(index).copied()
        }
    }?;

    Some(output_handle(kind, port_id))
}
