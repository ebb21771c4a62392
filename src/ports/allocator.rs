use crate::config::AllocatorConfig;
use crate::error::PortError;
use crate::lesson::{LessonGraph, Node, NodeKind, Port, PortKind};
use ahash::AHashSet;
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Issues port and node identifiers and applies the port authoring operations.
///
/// Ids are random alphanumeric strings. Every id the allocator has issued, observed or
/// retired is remembered, so an id is never handed out twice by the same allocator even
/// when the random source repeats itself.
pub struct PortAllocator {
    rng: StdRng,
    config: AllocatorConfig,
    issued: AHashSet<String>,
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::with_config(AllocatorConfig::default())
    }

    pub fn with_config(config: AllocatorConfig) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            config,
            issued: AHashSet::new(),
        }
    }

    /// A deterministic allocator, for tests and reproducible fixtures.
    pub fn seeded(config: AllocatorConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
            issued: AHashSet::new(),
        }
    }

    /// Marks every port id of an existing node as taken.
    pub fn observe_node(&mut self, node: &Node) {
        self.issued
            .extend(node.all_ports().map(|(_, p)| p.id.clone()));
        self.issued.insert(node.id.clone());
    }

    pub fn observe_graph(&mut self, graph: &LessonGraph) {
        for node in &graph.nodes {
            self.observe_node(node);
        }
        self.issued.extend(graph.edges.iter().map(|e| e.id.clone()));
    }

    pub fn has_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    /// Generates an id that is neither remembered by the allocator nor `taken`.
    pub fn generate_id(&mut self, taken: impl Fn(&str) -> bool) -> String {
        let mut length = self.config.id_length.max(1);
        let mut attempts = 0;
        loop {
            let candidate: String = (&mut self.rng)
                .sample_iter(&Alphanumeric)
                .take(length)
                .map(char::from)
                .collect();
            if !self.issued.contains(&candidate) && !taken(&candidate) {
                self.issued.insert(candidate.clone());
                return candidate;
            }
            attempts += 1;
            if attempts >= self.config.max_attempts {
                // The id space at this length is crowded; widen it instead of failing.
                length += 1;
                attempts = 0;
            }
        }
    }

    /// A fresh port id that does not collide with any port on `node`.
    pub fn port_id(&mut self, node: &Node) -> String {
        self.generate_id(|id| node.find_port(id).is_some())
    }

    /// A fresh node id of the form `{type}-{id}`, unique within `graph`.
    pub fn node_id(&mut self, kind: NodeKind, graph: &LessonGraph) -> String {
        let suffix = self.generate_id(|id| graph.node(&format!("{}-{}", kind, id)).is_some());
        format!("{}-{}", kind, suffix)
    }

    /// A fresh edge id, unique within `graph`.
    pub fn edge_id(&mut self, graph: &LessonGraph) -> String {
        let suffix = self.generate_id(|id| graph.edge(&format!("edge-{}", id)).is_some());
        format!("edge-{}", suffix)
    }

    /// Appends a new port to the node's `kind` collection and returns its id.
    pub fn add_port(&mut self, node: &mut Node, kind: PortKind) -> Result<String, PortError> {
        let id = self.port_id(node);
        let node_kind = node.kind();
        let node_id = node.id.clone();
        let ports = node
            .ports_mut(kind)
            .ok_or_else(|| PortError::UnsupportedKind {
                node_id: node_id.clone(),
                node_type: node_kind.to_string(),
                kind: kind.to_string(),
            })?;
        ports.push(new_port(node_kind, kind, id.clone()));
        debug!(node = %node_id, port = %id, %kind, "added port");
        Ok(id)
    }

    /// Removes one port, leaving its siblings and their ids untouched.
    ///
    /// Edges that referenced the port are not touched here; see
    /// [`crate::authoring::LessonEditor::remove_port`] for the orphan policy.
    pub fn remove_port(&mut self, node: &mut Node, port_id: &str) -> Result<(PortKind, Port), PortError> {
        let (kind, _) = node
            .find_port(port_id)
            .ok_or_else(|| PortError::PortNotFound {
                node_id: node.id.clone(),
                port_id: port_id.to_string(),
            })?;
        if kind == PortKind::Input && node.inputs.len() <= 1 {
            return Err(PortError::LastInput(node.id.clone()));
        }
        let node_id = node.id.clone();
        let ports = node.ports_mut(kind).ok_or_else(|| PortError::PortNotFound {
            node_id: node_id.clone(),
            port_id: port_id.to_string(),
        })?;
        let position = ports
            .iter()
            .position(|p| p.id == port_id)
            .ok_or_else(|| PortError::PortNotFound {
                node_id: node_id.clone(),
                port_id: port_id.to_string(),
            })?;
        let removed = ports.remove(position);
        // Retired ids stay in `issued` so they are never reused.
        self.issued.insert(removed.id.clone());
        debug!(node = %node_id, port = %port_id, %kind, "removed port");
        Ok((kind, removed))
    }
}

fn new_port(node_kind: NodeKind, kind: PortKind, id: String) -> Port {
    match (node_kind, kind) {
        (NodeKind::Quiz, PortKind::Option) => Port::answer(id, "New Answer", false),
        (NodeKind::Activity, PortKind::Option) => Port::with_text(id, "New Outcome"),
        (_, PortKind::Option) => Port::with_text(id, "New Option"),
        _ => Port::new(id),
    }
}
