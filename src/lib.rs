//! # Lessonflow - Branching Lesson Graphs and Deterministic Traversal
//!
//! **Lessonflow** models an interactive lesson as a directed graph of typed content blocks
//! (narration, quiz, choice, AI trigger, embedded activity) joined by edges between
//! stable ports, and walks that graph one node at a time.
//!
//! ## Core Workflow
//!
//! 1.  **Load a Lesson**: Parse a persisted lesson document with [`record::load_lesson_json`],
//!     which upgrades older layouts and validates the result. Custom formats implement
//!     [`lesson::IntoLesson`] instead.
//! 2.  **Author**: Use [`authoring::LessonEditor`] to add nodes, ports and edges. Port ids
//!     are issued once by [`ports::PortAllocator`] and never change, so edges stay valid
//!     as content is reordered.
//! 3.  **Play**: Start a [`engine::TraversalEngine`] on the graph and call `advance` with the
//!     outcome token of the active block, or let a [`adapter::LessonPlayer`] route signals
//!     from registered block adapters.
//!
//! ## Quick Start
//!
//! ```rust
//! use lessonflow::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut editor = LessonEditor::new(LessonMeta {
//!         id: "mars".to_string(),
//!         title: "Mission to Mars".to_string(),
//!         description: None,
//!     });
//!     let intro = editor.add_node(NodeKind::Narration)?;
//!     let pick = editor.add_node(NodeKind::Choice)?;
//!     let land = editor.add_node(NodeKind::End)?;
//!     let orbit = editor.add_node(NodeKind::End)?;
//!
//!     editor.connect(&intro, None, &pick)?;
//!     let options: Vec<String> = editor.graph().node(&pick).unwrap()
//!         .outgoing_ports().iter().map(|p| p.id.clone()).collect();
//!     editor.connect(&pick, Some(options[0].as_str()), &land)?;
//!     editor.connect(&pick, Some(options[1].as_str()), &orbit)?;
//!
//!     let mut engine = TraversalEngine::new();
//!     engine.start(editor.into_graph())?;
//!     engine.advance(None)?;
//!
//!     let token = OutcomeToken::port(NodeKind::Choice, &options[1]);
//!     let step = engine.advance(token.as_deref())?;
//!     assert_eq!(step.target(), Some(orbit.as_str()));
//!
//!     // End nodes have no exits; the lesson is over.
//!     assert!(engine.advance(None)?.is_no_path());
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod authoring;
pub mod config;
pub mod engine;
pub mod error;
pub mod lesson;
pub mod ports;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod store;
pub mod trace;
