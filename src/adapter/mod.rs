//! The contract between content-block renderers and the traversal engine.
//!
//! Blocks never call the engine directly. An active block gets a one-shot
//! [`OutcomeEmitter`]; the [`LessonPlayer`] receives what it sends and decides whether the
//! signal is still current before advancing.

mod contract;
mod player;

pub use contract::{
    ActivationId, AutoAdvance, BlockAdapter, BlockContext, BlockSignal, OutcomeEmitter,
    OutcomeToken, declared_tokens,
};
pub use player::{LessonPlayer, LessonPlayerBuilder};
