use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the persisted record layout produced by this crate.
///
/// Version 1 stored options, inputs and outputs as bare strings and addressed branches by
/// option index. Version 2 stores ports as `{id, text}` records addressed by port id.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// The type tag of a lesson node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Narration,
    Quiz,
    Choice,
    AiTrigger,
    Activity,
    Start,
    End,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Narration,
        NodeKind::Quiz,
        NodeKind::Choice,
        NodeKind::AiTrigger,
        NodeKind::Activity,
        NodeKind::Start,
        NodeKind::End,
    ];

    /// The canonical type name, as stored in records and used in handle strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Narration => "narration",
            NodeKind::Quiz => "quiz",
            NodeKind::Choice => "choice",
            NodeKind::AiTrigger => "aiTrigger",
            NodeKind::Activity => "activity",
            NodeKind::Start => "start",
            NodeKind::End => "end",
        }
    }

    /// Branching nodes pick their exit from a signal emitted by the block.
    pub fn is_branching(&self) -> bool {
        matches!(self, NodeKind::Choice | NodeKind::Quiz | NodeKind::Activity)
    }

    /// The collection holding this kind's outgoing ports, if it has one.
    pub fn outgoing_port_kind(&self) -> Option<PortKind> {
        match self {
            NodeKind::Narration | NodeKind::AiTrigger | NodeKind::Start => Some(PortKind::Output),
            NodeKind::Quiz | NodeKind::Choice | NodeKind::Activity => Some(PortKind::Option),
            NodeKind::End => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "narration" => Ok(NodeKind::Narration),
            "quiz" => Ok(NodeKind::Quiz),
            "choice" => Ok(NodeKind::Choice),
            "aiTrigger" | "ai_trigger" => Ok(NodeKind::AiTrigger),
            // Older lessons called mini-activities "game interactions".
            "activity" | "gameInteraction" | "game_interaction" => Ok(NodeKind::Activity),
            "start" => Ok(NodeKind::Start),
            "end" => Ok(NodeKind::End),
            other => Err(format!("Unknown node type: {}", other)),
        }
    }
}

/// Which of a node's port collections an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    /// Incoming connection points. Purely structural.
    Input,
    /// Unconditional or multi-exit outputs (narration, AI trigger, start).
    Output,
    /// Branch points carrying content (choice options, quiz answers, activity outcomes).
    Option,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Input => write!(f, "input"),
            PortKind::Output => write!(f, "output"),
            PortKind::Option => write!(f, "option"),
        }
    }
}

/// A connection point on a node. The id is issued once and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    pub text: String,
    /// Only meaningful for quiz answers.
    pub correct: Option<bool>,
}

impl Port {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            correct: None,
        }
    }

    pub fn answer(id: impl Into<String>, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            correct: Some(correct),
        }
    }
}

/// How a choice block presents its options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UiStyle {
    #[default]
    Buttons,
    Dropdown,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NarrationData {
    pub text: String,
    pub outputs: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizData {
    pub question: String,
    pub answers: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChoiceData {
    pub prompt: String,
    pub options: Vec<Port>,
    pub ui_style: UiStyle,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiTriggerData {
    pub ai_action: String,
    pub fallback_text: String,
    pub outputs: Vec<Port>,
}

/// An embedded mini-activity. Its internal logic is opaque; the engine only sees the
/// outcome token it eventually emits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityData {
    pub activity_id: String,
    pub prompt: String,
    /// Activity-specific settings as a JSON object, kept as text.
    pub configuration: String,
    pub options: Vec<Port>,
}

impl ActivityData {
    pub fn configuration_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        if self.configuration.trim().is_empty() {
            return Ok(serde_json::Value::Object(Default::default()));
        }
        serde_json::from_str(&self.configuration)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartData {
    pub outputs: Vec<Port>,
}

/// The type-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeContent {
    Narration(NarrationData),
    Quiz(QuizData),
    Choice(ChoiceData),
    AiTrigger(AiTriggerData),
    Activity(ActivityData),
    Start(StartData),
    End,
}

impl NodeContent {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeContent::Narration(_) => NodeKind::Narration,
            NodeContent::Quiz(_) => NodeKind::Quiz,
            NodeContent::Choice(_) => NodeKind::Choice,
            NodeContent::AiTrigger(_) => NodeKind::AiTrigger,
            NodeContent::Activity(_) => NodeKind::Activity,
            NodeContent::Start(_) => NodeKind::Start,
            NodeContent::End => NodeKind::End,
        }
    }
}

/// A single block of authored lesson content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub inputs: Vec<Port>,
    pub content: NodeContent,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>, content: NodeContent) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            inputs: Vec::new(),
            content,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<Port>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.content.kind()
    }

    /// Returns the port collection of the given kind, or `None` if this node type has none.
    pub fn ports(&self, kind: PortKind) -> Option<&[Port]> {
        match (kind, &self.content) {
            (PortKind::Input, _) => Some(&self.inputs),
            (PortKind::Output, NodeContent::Narration(d)) => Some(&d.outputs),
            (PortKind::Output, NodeContent::AiTrigger(d)) => Some(&d.outputs),
            (PortKind::Output, NodeContent::Start(d)) => Some(&d.outputs),
            (PortKind::Option, NodeContent::Quiz(d)) => Some(&d.answers),
            (PortKind::Option, NodeContent::Choice(d)) => Some(&d.options),
            (PortKind::Option, NodeContent::Activity(d)) => Some(&d.options),
            _ => None,
        }
    }

    pub fn ports_mut(&mut self, kind: PortKind) -> Option<&mut Vec<Port>> {
        match (kind, &mut self.content) {
            (PortKind::Input, _) => Some(&mut self.inputs),
            (PortKind::Output, NodeContent::Narration(d)) => Some(&mut d.outputs),
            (PortKind::Output, NodeContent::AiTrigger(d)) => Some(&mut d.outputs),
            (PortKind::Output, NodeContent::Start(d)) => Some(&mut d.outputs),
            (PortKind::Option, NodeContent::Quiz(d)) => Some(&mut d.answers),
            (PortKind::Option, NodeContent::Choice(d)) => Some(&mut d.options),
            (PortKind::Option, NodeContent::Activity(d)) => Some(&mut d.options),
            _ => None,
        }
    }

    /// The node's outgoing ports (outputs or options). Empty for end nodes.
    pub fn outgoing_ports(&self) -> &[Port] {
        self.kind()
            .outgoing_port_kind()
            .and_then(|kind| self.ports(kind))
            .unwrap_or(&[])
    }

    /// Every port on the node, inputs first, paired with the collection it belongs to.
    pub fn all_ports(&self) -> impl Iterator<Item = (PortKind, &Port)> {
        let outgoing_kind = self.kind().outgoing_port_kind();
        self.inputs
            .iter()
            .map(|p| (PortKind::Input, p))
            .chain(
                self.outgoing_ports()
                    .iter()
                    .filter_map(move |p| outgoing_kind.map(|k| (k, p))),
            )
    }

    pub fn find_port(&self, port_id: &str) -> Option<(PortKind, &Port)> {
        self.all_ports().find(|(_, p)| p.id == port_id)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// `None` marks the source node's unconditional exit.
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }
}

/// Descriptive lesson metadata carried alongside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonMeta {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

/// The canonical, validated lesson graph consumed by the traversal engine.
///
/// Node order is the authored order; it decides the entry-point fallback. Edge order is
/// the stored order; it decides ties during traversal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LessonGraph {
    pub lesson: LessonMeta,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl LessonGraph {
    pub fn new(lesson: LessonMeta) -> Self {
        Self {
            lesson,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    pub fn edge(&self, edge_id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == edge_id)
    }

    /// Outgoing edges of a node, in stored order.
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Nodes with no incoming edges, in authored order.
    pub fn entry_candidates(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| self.incoming_edges(&n.id).next().is_none())
            .collect()
    }
}
