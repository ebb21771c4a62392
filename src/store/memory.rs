use super::{LessonStore, upsert_edge, upsert_node};
use crate::error::StoreError;
use crate::lesson::{Edge, LessonGraph, Node};
use ahash::AHashMap;
use std::sync::{Mutex, MutexGuard};

/// Keeps lessons in process memory.
#[derive(Default)]
pub struct MemoryStore {
    lessons: Mutex<AHashMap<String, LessonGraph>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lesson(graph: LessonGraph) -> Self {
        let mut lessons = AHashMap::new();
        lessons.insert(graph.lesson.id.clone(), graph);
        Self {
            lessons: Mutex::new(lessons),
        }
    }

    pub fn lesson_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.lock()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn lock(&self) -> Result<MutexGuard<'_, AHashMap<String, LessonGraph>>, StoreError> {
        self.lessons
            .lock()
            .map_err(|e| StoreError::Backend(format!("Lesson map lock poisoned: {}", e)))
    }

    fn update(
        &self,
        lesson_id: &str,
        apply: impl FnOnce(&mut LessonGraph),
    ) -> Result<(), StoreError> {
        let mut lessons = self.lock()?;
        let graph = lessons
            .get_mut(lesson_id)
            .ok_or_else(|| StoreError::LessonNotFound(lesson_id.to_string()))?;
        apply(graph);
        Ok(())
    }
}

impl LessonStore for MemoryStore {
    fn fetch_graph(&self, lesson_id: &str) -> Result<LessonGraph, StoreError> {
        self.lock()?
            .get(lesson_id)
            .cloned()
            .ok_or_else(|| StoreError::LessonNotFound(lesson_id.to_string()))
    }

    fn save_graph(&self, graph: &LessonGraph) -> Result<(), StoreError> {
        self.lock()?.insert(graph.lesson.id.clone(), graph.clone());
        Ok(())
    }

    fn persist_node(&self, lesson_id: &str, node: &Node) -> Result<(), StoreError> {
        self.update(lesson_id, |graph| upsert_node(graph, node))
    }

    fn delete_node(&self, lesson_id: &str, node_id: &str) -> Result<(), StoreError> {
        self.update(lesson_id, |graph| graph.nodes.retain(|n| n.id != node_id))
    }

    fn persist_edge(&self, lesson_id: &str, edge: &Edge) -> Result<(), StoreError> {
        self.update(lesson_id, |graph| upsert_edge(graph, edge))
    }

    fn delete_edge(&self, lesson_id: &str, edge_id: &str) -> Result<(), StoreError> {
        self.update(lesson_id, |graph| graph.edges.retain(|e| e.id != edge_id))
    }
}
