use crate::engine::AnswerValue;
use crate::lesson::{Node, NodeKind};
use crate::schema::{output_handle, quiz_handle, source_handles};
use std::sync::mpsc::Sender;

/// Identifies one display of a block. Signals carrying an older activation are stale.
pub type ActivationId = u64;

/// The branch a block chose, in the handle format the authoring side saves.
///
/// `None` takes the node's unconditional exit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutcomeToken(Option<String>);

impl OutcomeToken {
    pub fn default_exit() -> Self {
        Self(None)
    }

    /// The token for a port-backed exit: `{nodeType}-out-{portId}`.
    pub fn port(kind: NodeKind, port_id: &str) -> Self {
        Self(Some(output_handle(kind, port_id)))
    }

    /// The token for a quiz result: `correct` or `incorrect`.
    pub fn quiz(correct: bool) -> Self {
        Self(Some(quiz_handle(correct).to_string()))
    }

    /// A raw handle string, for blocks that already hold one.
    pub fn raw(handle: impl Into<String>) -> Self {
        Self(Some(handle.into()))
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_default_exit(&self) -> bool {
        self.0.is_none()
    }
}

/// Every token a block for `node` may emit, excluding the default exit.
pub fn declared_tokens(node: &Node) -> Vec<OutcomeToken> {
    source_handles(node).into_iter().map(OutcomeToken::raw).collect()
}

/// What an emitter sends to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSignal {
    pub activation: ActivationId,
    pub node_id: String,
    pub token: OutcomeToken,
    /// A learner response to record before advancing.
    pub answer: Option<AnswerValue>,
}

/// The one-shot callback handed to an active block.
///
/// Emitting consumes the emitter, so a block can emit at most once per activation.
/// Dropping it without emitting stalls the lesson, which is an accepted outcome.
#[derive(Debug)]
pub struct OutcomeEmitter {
    activation: ActivationId,
    node_id: String,
    sender: Sender<BlockSignal>,
}

impl OutcomeEmitter {
    pub(crate) fn new(activation: ActivationId, node_id: String, sender: Sender<BlockSignal>) -> Self {
        Self {
            activation,
            node_id,
            sender,
        }
    }

    pub fn activation(&self) -> ActivationId {
        self.activation
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn emit(self, token: OutcomeToken) {
        self.send(token, None);
    }

    /// Records a learner response and emits in one step.
    pub fn answer(self, value: impl Into<AnswerValue>, token: OutcomeToken) {
        self.send(token, Some(value.into()));
    }

    fn send(self, token: OutcomeToken, answer: Option<AnswerValue>) {
        // A closed channel means the player was dropped; nobody is listening anymore.
        let _ = self.sender.send(BlockSignal {
            activation: self.activation,
            node_id: self.node_id,
            token,
            answer,
        });
    }
}

/// What a block receives on activation.
pub struct BlockContext<'a> {
    pub node: &'a Node,
    /// `false` when the block is rendered for review (e.g. replaying history).
    pub is_active: bool,
    /// Present only for the active node.
    pub emitter: Option<OutcomeEmitter>,
}

/// A content-block renderer that participates in traversal.
///
/// Implementors may do arbitrary work between activation and emitting, including
/// holding on to the emitter and emitting later from another callback.
pub trait BlockAdapter {
    /// The node type this adapter renders.
    fn node_kind(&self) -> NodeKind;

    fn activate(&mut self, ctx: BlockContext<'_>);
}

/// Emits the default exit as soon as it is activated. Suits narration, start and AI
/// trigger blocks in headless runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoAdvance(pub NodeKind);

impl BlockAdapter for AutoAdvance {
    fn node_kind(&self) -> NodeKind {
        self.0
    }

    fn activate(&mut self, ctx: BlockContext<'_>) {
        if let Some(emitter) = ctx.emitter {
            emitter.emit(OutcomeToken::default_exit());
        }
    }
}
