use super::{LessonStore, upsert_edge, upsert_node};
use crate::error::{RecordError, StoreError};
use crate::lesson::{Edge, LessonGraph, Node};
use crate::ports::PortAllocator;
use crate::record::{LessonRecord, load_lesson_json};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stores each lesson as `{lesson_id}.json` in one directory.
///
/// Reads go through the versioned upgrade. A file that needed upgrading is rewritten in
/// the current layout on that first read, so its new port ids are stable from then on.
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, lesson_id: &str) -> Result<PathBuf, StoreError> {
        if lesson_id.is_empty()
            || lesson_id == "."
            || lesson_id == ".."
            || lesson_id.contains(['/', '\\'])
        {
            return Err(StoreError::Backend(format!(
                "'{}' is not usable as a lesson file name",
                lesson_id
            )));
        }
        Ok(self.root.join(format!("{}.json", lesson_id)))
    }

    fn update(
        &self,
        lesson_id: &str,
        apply: impl FnOnce(&mut LessonGraph),
    ) -> Result<(), StoreError> {
        let mut graph = self.fetch_graph(lesson_id)?;
        apply(&mut graph);
        self.save_graph(&graph)
    }
}

impl LessonStore for JsonDirStore {
    fn fetch_graph(&self, lesson_id: &str) -> Result<LessonGraph, StoreError> {
        let path = self.path_for(lesson_id)?;
        let json = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::LessonNotFound(lesson_id.to_string()),
            _ => StoreError::Io(e),
        })?;
        let loaded = load_lesson_json(&json, &mut PortAllocator::new())?;
        // Ids issued by the upgrade must reach disk, or the next read issues new ones.
        if !loaded.upgrade.is_noop() {
            write_lesson(&path, &loaded.graph)?;
            info!(
                lesson = %lesson_id,
                from = loaded.upgrade.from_version,
                "upgraded lesson file written back"
            );
        }
        Ok(loaded.graph)
    }

    fn save_graph(&self, graph: &LessonGraph) -> Result<(), StoreError> {
        let path = self.path_for(&graph.lesson.id)?;
        write_lesson(&path, graph)
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

fn write_lesson(path: &Path, graph: &LessonGraph) -> Result<(), StoreError> {
    let json = LessonRecord::from(graph)
        .to_json_pretty()
        .map_err(RecordError::from)?;
    fs::write(path, json)?;
    debug!(path = %path.display(), "lesson written");
    Ok(())
}
