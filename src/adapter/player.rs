use super::contract::{ActivationId, BlockAdapter, BlockContext, BlockSignal, OutcomeEmitter};
use crate::config::{PlayerConfig, TraversalConfig};
use crate::engine::{Session, Step, TraversalEngine};
use crate::error::TraversalError;
use crate::lesson::{LessonGraph, NodeKind};
use crate::schema::defines_source_handle;
use ahash::AHashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, warn};

/// Connects block adapters to a [`TraversalEngine`] through a signal channel.
///
/// Each time the engine lands on a node the player activates that node's adapter with a
/// fresh [`OutcomeEmitter`]. Emitted signals queue up until [`LessonPlayer::pump`] drains
/// them; only a signal from the current activation can move the lesson.
pub struct LessonPlayer {
    engine: TraversalEngine,
    adapters: AHashMap<NodeKind, Box<dyn BlockAdapter>>,
    config: PlayerConfig,
    sender: Sender<BlockSignal>,
    receiver: Receiver<BlockSignal>,
    activation: ActivationId,
}

pub struct LessonPlayerBuilder {
    traversal: TraversalConfig,
    config: PlayerConfig,
    adapters: AHashMap<NodeKind, Box<dyn BlockAdapter>>,
}

impl LessonPlayerBuilder {
    pub fn new() -> Self {
        Self {
            traversal: TraversalConfig::default(),
            config: PlayerConfig::default(),
            adapters: AHashMap::new(),
        }
    }

    pub fn with_traversal_config(mut self, traversal: TraversalConfig) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an adapter for its node kind, replacing any earlier one.
    pub fn with_adapter(mut self, adapter: Box<dyn BlockAdapter>) -> Self {
        self.adapters.insert(adapter.node_kind(), adapter);
        self
    }

    pub fn build(self) -> LessonPlayer {
        let (sender, receiver) = mpsc::channel();
        LessonPlayer {
            engine: TraversalEngine::with_config(self.traversal),
            adapters: self.adapters,
            config: self.config,
            sender,
            receiver,
            activation: 0,
        }
    }
}

impl Default for LessonPlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LessonPlayer {
    pub fn builder() -> LessonPlayerBuilder {
        LessonPlayerBuilder::new()
    }

    /// Starts `graph` from its entry node and activates the entry block.
    pub fn load(&mut self, graph: impl Into<Arc<LessonGraph>>) -> Result<ActivationId, TraversalError> {
        self.engine.start(graph)?;
        self.discard_pending();
        Ok(self.activate_current())
    }

    /// Continues a saved session and activates the block it stopped at.
    pub fn resume(
        &mut self,
        graph: impl Into<Arc<LessonGraph>>,
        session: Session,
    ) -> Result<ActivationId, TraversalError> {
        self.engine.resume(graph, session)?;
        self.discard_pending();
        Ok(self.activate_current())
    }

    fn discard_pending(&mut self) {
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            debug!(dropped, "discarded signals from the previous lesson");
        }
    }

    /// Activates the current node's block with a new emitter. Any emitter handed out
    /// earlier becomes stale.
    pub fn activate_current(&mut self) -> ActivationId {
        self.activation += 1;
        let activation = self.activation;
        let Some(node) = self.engine.current_node() else {
            return activation;
        };
        let Some(adapter) = self.adapters.get_mut(&node.kind()) else {
            warn!(node = %node.id, kind = %node.kind(), "no block adapter registered; lesson stalls here");
            return activation;
        };
        debug!(node = %node.id, activation, "activating block");
        let emitter = OutcomeEmitter::new(activation, node.id.clone(), self.sender.clone());
        adapter.activate(BlockContext {
            node,
            is_active: true,
            emitter: Some(emitter),
        });
        activation
    }

    /// Renders every visited node before the current one in review mode, without emitters.
    pub fn replay_history(&mut self) {
        let history = self.engine.history();
        let Some((_, visited)) = history.split_last() else {
            return;
        };
        for node_id in visited {
            let Some(node) = self.engine.node(node_id) else {
                continue;
            };
            if let Some(adapter) = self.adapters.get_mut(&node.kind()) {
                adapter.activate(BlockContext {
                    node,
                    is_active: false,
                    emitter: None,
                });
            }
        }
    }

    /// Drains pending signals and advances the engine for each live one.
    ///
    /// Stale signals are dropped. Blocks that emit during activation are handled in the
    /// same call, up to `max_steps_per_pump` transitions.
    pub fn pump(&mut self) -> Result<Vec<Step>, TraversalError> {
        let mut steps = Vec::new();
        while steps.len() < self.config.max_steps_per_pump {
            let Ok(signal) = self.receiver.try_recv() else {
                break;
            };
            if signal.activation != self.activation {
                warn!(
                    node = %signal.node_id,
                    activation = signal.activation,
                    current = self.activation,
                    "dropping stale block signal"
                );
                continue;
            }
            let token = signal.token.as_deref();
            if let (Some(token), Some(node)) = (token, self.engine.current_node()) {
                if !defines_source_handle(node, token) {
                    warn!(node = %node.id, token, "block emitted an undeclared token");
                }
            }
            if let Some(answer) = signal.answer {
                self.engine.record_answer(&signal.node_id, answer)?;
            }
            let step = self.engine.advance(token)?;
            // The emitter that produced this signal is spent either way.
            self.activation += 1;
            let moved = !step.is_no_path();
            steps.push(step);
            if moved {
                self.activate_current();
            }
        }
        if steps.len() >= self.config.max_steps_per_pump {
            warn!(
                limit = self.config.max_steps_per_pump,
                "step limit reached; remaining signals stay queued"
            );
        }
        Ok(steps)
    }

    pub fn engine(&self) -> &TraversalEngine {
        &self.engine
    }

    pub fn current_activation(&self) -> ActivationId {
        self.activation
    }

    pub fn is_finished(&self) -> bool {
        self.engine.session().is_some_and(Session::is_finished)
    }
}
