use super::upgrade::{UpgradeReport, upgrade};
use super::{EdgeRecord, LessonRecord, NodeDataRecord, NodeRecord, PortRecord};
use crate::error::{RecordError, ValidationError};
use crate::lesson::{
    ActivityData, AiTriggerData, CURRENT_SCHEMA_VERSION, ChoiceData, Edge, IntoLesson, LessonGraph,
    NarrationData, Node, NodeContent, NodeKind, Port, QuizData, StartData, UiStyle,
};
use crate::ports::PortAllocator;
use crate::schema::{GraphWarning, validate_graph};
use tracing::warn;

/// The result of loading a persisted lesson.
#[derive(Debug)]
pub struct LoadedLesson {
    pub graph: LessonGraph,
    pub warnings: Vec<GraphWarning>,
    pub upgrade: UpgradeReport,
}

/// Parses, upgrades, converts and validates a lesson document.
///
/// Structural problems are errors. Orphaned handles and other tolerated inconsistencies
/// are logged and returned as warnings.
pub fn load_lesson_json(
    json: &str,
    allocator: &mut PortAllocator,
) -> Result<LoadedLesson, RecordError> {
    let mut record = LessonRecord::from_json(json)?;
    let report = upgrade(&mut record, allocator);
    let graph = record.into_lesson()?;
    let warnings = validate_graph(&graph)?;
    for warning in &warnings {
        warn!(lesson = %graph.lesson.id, "{}", warning);
    }
    allocator.observe_graph(&graph);
    Ok(LoadedLesson {
        graph,
        warnings,
        upgrade: report,
    })
}

impl IntoLesson for LessonRecord {
    fn into_lesson(self) -> Result<LessonGraph, RecordError> {
        let nodes = self
            .nodes
            .into_iter()
            .map(convert_node)
            .collect::<Result<Vec<_>, _>>()?;
        let edges = self
            .edges
            .into_iter()
            .map(convert_edge)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LessonGraph {
            lesson: self.lesson,
            nodes,
            edges,
        })
    }
}

fn convert_node(record: NodeRecord) -> Result<Node, ValidationError> {
    let kind: NodeKind = record
        .node_type
        .parse()
        .map_err(|_| ValidationError::UnknownNodeType {
            node_id: record.id.clone(),
            type_name: record.node_type.clone(),
        })?;
    let id = record.id;
    let data = record.data;
    let ports = |collection: &str, ports: Option<Vec<PortRecord>>| convert_ports(&id, collection, ports);

    let content = match kind {
        NodeKind::Narration => NodeContent::Narration(NarrationData {
            text: data.text.unwrap_or_default(),
            outputs: ports("outputs", data.outputs)?,
        }),
        NodeKind::Quiz => NodeContent::Quiz(QuizData {
            question: data.question.unwrap_or_default(),
            answers: ports("answers", data.answers.or(data.options))?,
        }),
        NodeKind::Choice => NodeContent::Choice(ChoiceData {
            prompt: data.prompt.unwrap_or_default(),
            options: ports("options", data.options)?,
            ui_style: match data.ui_style.as_deref() {
                Some("dropdown") => UiStyle::Dropdown,
                _ => UiStyle::Buttons,
            },
        }),
        NodeKind::AiTrigger => NodeContent::AiTrigger(AiTriggerData {
            ai_action: data.ai_action.unwrap_or_default(),
            fallback_text: data.fallback_text.unwrap_or_default(),
            outputs: ports("outputs", data.outputs)?,
        }),
        NodeKind::Activity => NodeContent::Activity(ActivityData {
            activity_id: data.activity_id.unwrap_or_default(),
            prompt: data.prompt.unwrap_or_default(),
            configuration: data
                .configuration
                .map(|c| c.to_string())
                .unwrap_or_else(|| "{}".to_string()),
            options: ports("options", data.options)?,
        }),
        NodeKind::Start => NodeContent::Start(StartData {
            outputs: ports("outputs", data.outputs)?,
        }),
        NodeKind::End => NodeContent::End,
    };

    Ok(Node {
        inputs: convert_ports(&id, "inputs", data.inputs)?,
        id,
        label: data.label,
        content,
    })
}

fn convert_ports(
    node_id: &str,
    collection: &str,
    ports: Option<Vec<PortRecord>>,
) -> Result<Vec<Port>, ValidationError> {
    ports
        .unwrap_or_default()
        .into_iter()
        .map(|port| match port {
            PortRecord::Port { id, text, correct } => Ok(Port { id, text, correct }),
            PortRecord::Legacy(_) => Err(ValidationError::LegacyPorts {
                node_id: node_id.to_string(),
                collection: collection.to_string(),
            }),
        })
        .collect()
}

fn convert_edge(record: EdgeRecord) -> Result<Edge, ValidationError> {
    if record.id.trim().is_empty() {
        return Err(ValidationError::MissingField {
            record: format!("edge '{}' -> '{}'", record.source, record.target),
            field: "id".to_string(),
        });
    }
    Ok(Edge {
        id: record.id,
        source: record.source,
        target: record.target,
        source_handle: record.source_handle,
        target_handle: record.target_handle,
    })
}

impl From<&LessonGraph> for LessonRecord {
    fn from(graph: &LessonGraph) -> Self {
        LessonRecord {
            schema_version: CURRENT_SCHEMA_VERSION,
            lesson: graph.lesson.clone(),
            nodes: graph.nodes.iter().map(node_record).collect(),
            edges: graph
                .edges
                .iter()
                .map(|e| EdgeRecord {
                    id: e.id.clone(),
                    source: e.source.clone(),
                    target: e.target.clone(),
                    source_handle: e.source_handle.clone(),
                    target_handle: e.target_handle.clone(),
                })
                .collect(),
        }
    }
}

fn node_record(node: &Node) -> NodeRecord {
    let mut data = NodeDataRecord {
        label: node.label.clone(),
        inputs: Some(port_records(&node.inputs)),
        ..Default::default()
    };
    match &node.content {
        NodeContent::Narration(d) => {
            data.text = Some(d.text.clone());
            data.outputs = Some(port_records(&d.outputs));
        }
        NodeContent::Quiz(d) => {
            data.question = Some(d.question.clone());
            data.answers = Some(port_records(&d.answers));
        }
        NodeContent::Choice(d) => {
            data.prompt = Some(d.prompt.clone());
            data.options = Some(port_records(&d.options));
            data.ui_style = Some(
                match d.ui_style {
                    UiStyle::Buttons => "buttons",
                    UiStyle::Dropdown => "dropdown",
                }
                .to_string(),
            );
        }
        NodeContent::AiTrigger(d) => {
            data.ai_action = Some(d.ai_action.clone());
            data.fallback_text = Some(d.fallback_text.clone());
            data.outputs = Some(port_records(&d.outputs));
        }
        NodeContent::Activity(d) => {
            data.activity_id = Some(d.activity_id.clone());
            data.prompt = Some(d.prompt.clone());
            data.configuration = Some(
                d.configuration_value()
                    .unwrap_or_else(|_| serde_json::Value::String(d.configuration.clone())),
            );
            data.options = Some(port_records(&d.options));
        }
        NodeContent::Start(d) => {
            data.outputs = Some(port_records(&d.outputs));
        }
        NodeContent::End => {}
    }
    NodeRecord {
        id: node.id.clone(),
        node_type: node.kind().as_str().to_string(),
        data,
    }
}

fn port_records(ports: &[Port]) -> Vec<PortRecord> {
    ports
        .iter()
        .map(|p| PortRecord::Port {
            id: p.id.clone(),
            text: p.text.clone(),
            correct: p.correct,
        })
        .collect()
}
