//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the lessonflow
//! crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use lessonflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/lesson.json")?;
//! let loaded = load_lesson_json(&json, &mut PortAllocator::new())?;
//! for warning in &loaded.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//!
//! let mut engine = TraversalEngine::new();
//! let entry = engine.start(loaded.graph)?;
//! println!("Starting at {}", entry.label);
//!
//! while let Step::Moved(transition) = engine.advance(None)? {
//!     println!("{}", PathFormatter::format_step(&Step::Moved(transition)));
//! }
//! # Ok(())
//! # }
//! ```

// Graph model
pub use crate::lesson::{
    Edge, IntoLesson, LessonBundle, LessonGraph, LessonMeta, NarrationData, Node, NodeContent,
    NodeKind, Port, PortKind, SessionSnapshot,
};

// Loading, authoring and storage
pub use crate::authoring::LessonEditor;
pub use crate::ports::PortAllocator;
pub use crate::record::{LessonRecord, load_lesson_json};
pub use crate::schema::{GraphWarning, validate_graph};
pub use crate::store::{LessonStore, MemoryStore};

// Traversal
pub use crate::adapter::{BlockAdapter, BlockContext, LessonPlayer, OutcomeToken};
pub use crate::engine::{AnswerValue, Step, TraversalEngine};

// Configuration and errors
pub use crate::config::LessonflowConfig;
pub use crate::error::{EditorError, TraversalError, ValidationError};

// Trace formatting
pub use crate::trace::PathFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
