use crate::config::TraversalConfig;
use crate::error::TraversalError;
use crate::lesson::{Edge, LessonGraph, Node};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

mod resolve;

pub use resolve::{MatchRule, resolve_edge};

/// A learner's recorded response to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerValue {
    /// Position of the chosen option.
    Index(usize),
    /// Free text, or the text of the chosen option.
    Text(String),
    Flag(bool),
    Number(f64),
}

impl From<usize> for AnswerValue {
    fn from(value: usize) -> Self {
        AnswerValue::Index(value)
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        AnswerValue::Flag(value)
    }
}

impl From<f64> for AnswerValue {
    fn from(value: f64) -> Self {
        AnswerValue::Number(value)
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Index(i) => write!(f, "#{}", i),
            AnswerValue::Text(s) => write!(f, "{}", s),
            AnswerValue::Flag(b) => write!(f, "{}", b),
            AnswerValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// The ephemeral state of one play session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Session {
    current: String,
    history: Vec<String>,
    answers: AHashMap<String, AnswerValue>,
    finished: bool,
}

impl Session {
    fn at(entry: &str) -> Self {
        Self {
            current: entry.to_string(),
            history: vec![entry.to_string()],
            answers: AHashMap::new(),
            finished: false,
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn answers(&self) -> &AHashMap<String, AnswerValue> {
        &self.answers
    }

    /// Set once an `advance` found no path out of the current node. A finished session
    /// never moves again.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// A successful move along one edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub edge_id: String,
    pub rule: MatchRule,
}

/// The result of [`TraversalEngine::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Moved(Transition),
    /// No edge leads out of `at` for the given token. This is how lessons end.
    NoPath { at: String },
}

impl Step {
    pub fn is_no_path(&self) -> bool {
        matches!(self, Step::NoPath { .. })
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Step::Moved(t) => Some(&t.to),
            Step::NoPath { .. } => None,
        }
    }
}

/// Node positions and outgoing edges, precomputed once per loaded lesson.
struct GraphIndex {
    positions: AHashMap<String, usize>,
    outgoing: AHashMap<String, Vec<usize>>,
}

impl GraphIndex {
    fn build(graph: &LessonGraph) -> Self {
        let positions = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let mut outgoing: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (i, edge) in graph.edges.iter().enumerate() {
            outgoing.entry(edge.source.clone()).or_default().push(i);
        }
        Self {
            positions,
            outgoing,
        }
    }

    fn node<'g>(&self, graph: &'g LessonGraph, node_id: &str) -> Option<&'g Node> {
        self.positions.get(node_id).map(|&i| &graph.nodes[i])
    }

    fn outgoing<'g>(&self, graph: &'g LessonGraph, node_id: &str) -> Vec<&'g Edge> {
        self.outgoing
            .get(node_id)
            .map(|edges| edges.iter().map(|&i| &graph.edges[i]).collect())
            .unwrap_or_default()
    }

    /// The single node without incoming edges, or the first authored node otherwise.
    fn entry<'g>(&self, graph: &'g LessonGraph) -> Option<&'g Node> {
        let candidates = graph.entry_candidates();
        match candidates.as_slice() {
            [only] => Some(*only),
            _ => {
                let first = graph.nodes.first()?;
                warn!(
                    lesson = %graph.lesson.id,
                    candidates = candidates.len(),
                    entry = %first.id,
                    "no unique entry node, starting at the first authored node"
                );
                Some(first)
            }
        }
    }
}

struct LoadedLesson {
    graph: Arc<LessonGraph>,
    index: GraphIndex,
    session: Session,
}

/// Walks a lesson graph one node at a time.
///
/// The engine holds the graph read-only for the lifetime of a session and owns the
/// session state. Loading another lesson replaces graph and session in one assignment,
/// so a half-initialised session is never observable.
#[derive(Default)]
pub struct TraversalEngine {
    config: TraversalConfig,
    loaded: Option<LoadedLesson>,
}

impl TraversalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TraversalConfig) -> Self {
        Self {
            config,
            loaded: None,
        }
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Starts a new session at the lesson's entry node, discarding any previous session.
    pub fn start(&mut self, graph: impl Into<Arc<LessonGraph>>) -> Result<&Node, TraversalError> {
        let graph = graph.into();
        let index = GraphIndex::build(&graph);
        let entry = index.entry(&graph).ok_or(TraversalError::EmptyGraph)?;
        let session = Session::at(&entry.id);
        info!(lesson = %graph.lesson.id, entry = %entry.id, "lesson session started");
        self.install(graph, index, session)
    }

    /// Resumes a previously saved session on the given graph.
    pub fn resume(
        &mut self,
        graph: impl Into<Arc<LessonGraph>>,
        session: Session,
    ) -> Result<&Node, TraversalError> {
        let graph = graph.into();
        if graph.is_empty() {
            return Err(TraversalError::EmptyGraph);
        }
        let index = GraphIndex::build(&graph);
        if let Some(missing) = session
            .history
            .iter()
            .chain(std::iter::once(&session.current))
            .chain(session.answers.keys())
            .find(|id| !index.positions.contains_key(id.as_str()))
        {
            return Err(TraversalError::NodeNotFound(missing.clone()));
        }
        info!(lesson = %graph.lesson.id, at = %session.current, "lesson session resumed");
        self.install(graph, index, session)
    }

    fn install(
        &mut self,
        graph: Arc<LessonGraph>,
        index: GraphIndex,
        session: Session,
    ) -> Result<&Node, TraversalError> {
        let loaded = self.loaded.insert(LoadedLesson {
            graph,
            index,
            session,
        });
        loaded
            .index
            .node(&loaded.graph, &loaded.session.current)
            .ok_or_else(|| TraversalError::NodeNotFound(loaded.session.current.clone()))
    }

    /// Ends the current session and drops its state.
    pub fn end_session(&mut self) -> Option<Session> {
        self.loaded.take().map(|l| l.session)
    }

    /// Stores a learner response, replacing any earlier response for the same node.
    pub fn record_answer(
        &mut self,
        node_id: &str,
        value: impl Into<AnswerValue>,
    ) -> Result<(), TraversalError> {
        let loaded = self.loaded.as_mut().ok_or(TraversalError::NotStarted)?;
        let value = value.into();
        debug!(node = %node_id, answer = %value, "answer recorded");
        loaded.session.answers.insert(node_id.to_string(), value);
        Ok(())
    }

    /// Computes where `token` leads from the current node without moving.
    pub fn peek(&self, token: Option<&str>) -> Result<Step, TraversalError> {
        let loaded = self.loaded.as_ref().ok_or(TraversalError::NotStarted)?;
        if loaded.session.finished {
            return Ok(Step::NoPath {
                at: loaded.session.current.clone(),
            });
        }
        Ok(self.resolve_from(loaded, &loaded.session.current, token))
    }

    /// Moves to the next node chosen by `token`, or reports that there is none.
    ///
    /// `NoPath` is terminal: once returned, every later call returns it again without
    /// looking at the token, until `start` or `resume` installs a new session.
    pub fn advance(&mut self, token: Option<&str>) -> Result<Step, TraversalError> {
        let step = self.peek(token)?;

        let loaded = self.loaded.as_mut().ok_or(TraversalError::NotStarted)?;
        match &step {
            Step::Moved(transition) => {
                if loaded.index.node(&loaded.graph, &transition.to).is_none() {
                    return Err(TraversalError::NodeNotFound(transition.to.clone()));
                }
                if transition.rule.is_fallback() {
                    warn!(
                        from = %transition.from,
                        to = %transition.to,
                        edge = %transition.edge_id,
                        token = token.unwrap_or("<none>"),
                        rule = %transition.rule,
                        "advanced through a fallback rule"
                    );
                } else {
                    debug!(
                        from = %transition.from,
                        to = %transition.to,
                        edge = %transition.edge_id,
                        rule = %transition.rule,
                        "advanced"
                    );
                }
                loaded.session.current = transition.to.clone();
                loaded.session.history.push(transition.to.clone());
            }
            Step::NoPath { at } => {
                if !loaded.session.finished {
                    info!(at = %at, token = token.unwrap_or("<none>"), "no path; lesson finished");
                }
                loaded.session.finished = true;
            }
        }
        Ok(step)
    }

    fn resolve_from(&self, loaded: &LoadedLesson, node_id: &str, token: Option<&str>) -> Step {
        let outgoing = loaded.index.outgoing(&loaded.graph, node_id);
        match resolve_edge(&outgoing, token, &self.config) {
            Some((edge, rule)) => Step::Moved(Transition {
                from: node_id.to_string(),
                to: edge.target.clone(),
                edge_id: edge.id.clone(),
                rule,
            }),
            None => Step::NoPath {
                at: node_id.to_string(),
            },
        }
    }

    pub fn is_started(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn graph(&self) -> Option<&Arc<LessonGraph>> {
        self.loaded.as_ref().map(|l| &l.graph)
    }

    pub fn session(&self) -> Option<&Session> {
        self.loaded.as_ref().map(|l| &l.session)
    }

    pub fn current_node(&self) -> Option<&Node> {
        let loaded = self.loaded.as_ref()?;
        loaded.index.node(&loaded.graph, &loaded.session.current)
    }

    /// Visited node ids in order, starting with the entry. Empty before `start`.
    pub fn history(&self) -> &[String] {
        self.session().map(Session::history).unwrap_or(&[])
    }

    pub fn answers(&self) -> Option<&AHashMap<String, AnswerValue>> {
        self.session().map(Session::answers)
    }

    pub fn answer(&self, node_id: &str) -> Option<&AnswerValue> {
        self.answers()?.get(node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        let loaded = self.loaded.as_ref()?;
        loaded.index.node(&loaded.graph, node_id)
    }
}
