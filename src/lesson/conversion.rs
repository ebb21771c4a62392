use super::definition::LessonGraph;
use crate::error::RecordError;

/// A trait for custom lesson formats that can be converted into a canonical `LessonGraph`.
///
/// This is the extension point that keeps the engine independent of any one storage
/// layout. The crate's own JSON record format implements it in [`crate::record`]; a host
/// with a different persisted shape implements it on its own structs.
///
/// # Example
///
/// ```rust,no_run
/// use lessonflow::prelude::*;
/// use lessonflow::error::RecordError;
///
/// struct Slide { id: String, text: String }
/// struct SlideDeck { title: String, slides: Vec<Slide> }
///
/// impl IntoLesson for SlideDeck {
///     fn into_lesson(self) -> std::result::Result<LessonGraph, RecordError> {
///         let mut graph = LessonGraph::new(LessonMeta {
///             id: self.title.to_lowercase(),
///             title: self.title,
///             description: None,
///         });
///         for slide in &self.slides {
///             graph.nodes.push(Node::new(
///                 slide.id.clone(),
///                 slide.id.clone(),
///                 NodeContent::Narration(NarrationData { text: slide.text.clone(), outputs: vec![] }),
///             ));
///         }
///         for (i, pair) in self.slides.windows(2).enumerate() {
///             graph.edges.push(Edge::new(format!("e{}", i), pair[0].id.clone(), pair[1].id.clone()));
///         }
///         Ok(graph)
///     }
/// }
/// ```
pub trait IntoLesson {
    /// Consumes the object and converts it into a lesson graph.
    fn into_lesson(self) -> Result<LessonGraph, RecordError>;
}
