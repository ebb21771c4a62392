//! Authoring editor and storage tests
mod common;
use common::*;
use lessonflow::authoring::LessonEditor;
use lessonflow::config::{EditorConfig, OrphanPolicy};
use lessonflow::engine::TraversalEngine;
use lessonflow::error::{EditorError, PortError, StoreError, ValidationError};
use lessonflow::lesson::{
    CURRENT_SCHEMA_VERSION, Edge, LessonGraph, Node, NodeContent, NodeKind, PortKind,
};
use lessonflow::schema::{GraphWarning, validate_graph};
use lessonflow::store::{JsonDirStore, LessonStore, MemoryStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::tempdir;

#[cfg(test)]
mod authoring_tests {
    use super::*;

    fn option_ids(editor: &LessonEditor, node_id: &str) -> Vec<String> {
        editor
            .graph()
            .node(node_id)
            .unwrap()
            .outgoing_ports()
            .iter()
            .map(|p| p.id.clone())
            .collect()
    }

    /// A memory store whose deletes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_node_deletes: AtomicBool,
        fail_edge_deletes: AtomicBool,
    }

    impl LessonStore for FlakyStore {
        fn fetch_graph(&self, lesson_id: &str) -> Result<LessonGraph, StoreError> {
            self.inner.fetch_graph(lesson_id)
        }

        fn save_graph(&self, graph: &LessonGraph) -> Result<(), StoreError> {
            self.inner.save_graph(graph)
        }

        fn persist_node(&self, lesson_id: &str, node: &Node) -> Result<(), StoreError> {
            self.inner.persist_node(lesson_id, node)
        }

        fn delete_node(&self, lesson_id: &str, node_id: &str) -> Result<(), StoreError> {
            if self.fail_node_deletes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("node delete refused".to_string()));
            }
            self.inner.delete_node(lesson_id, node_id)
        }

        fn persist_edge(&self, lesson_id: &str, edge: &Edge) -> Result<(), StoreError> {
            self.inner.persist_edge(lesson_id, edge)
        }

        fn delete_edge(&self, lesson_id: &str, edge_id: &str) -> Result<(), StoreError> {
            if self.fail_edge_deletes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("edge delete refused".to_string()));
            }
            self.inner.delete_edge(lesson_id, edge_id)
        }
    }

    #[test]
    fn test_add_node_uses_type_defaults() {
        let mut editor = LessonEditor::new(meta("l"));
        let id = editor.add_node(NodeKind::Choice).unwrap();
        assert!(id.starts_with("choice-"));

        let node = editor.graph().node(&id).unwrap();
        assert_eq!(node.label, "New Choice");
        assert_eq!(node.inputs.len(), 1);
        let texts: Vec<_> = node.outgoing_ports().iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Path A", "Path B"]);
    }

    #[test]
    fn test_connect_derives_handles() {
        let mut editor = LessonEditor::new(meta("l"));
        let pick = editor.add_node(NodeKind::Choice).unwrap();
        let quiz = editor.add_node(NodeKind::Quiz).unwrap();
        let done = editor.add_node(NodeKind::End).unwrap();
        let options = option_ids(&editor, &pick);

        let e1 = editor.connect(&pick, Some(options[1].as_str()), &quiz).unwrap();
        let e2 = editor.connect(&quiz, Some("correct"), &done).unwrap();

        let graph = editor.graph();
        let first = graph.edge(&e1).unwrap();
        assert_eq!(first.source_handle, Some(format!("choice-out-{}", options[1])));
        let quiz_input = &graph.node(&quiz).unwrap().inputs[0].id;
        assert_eq!(first.target_handle, Some(format!("in-{}", quiz_input)));
        assert_eq!(graph.edge(&e2).unwrap().source_handle.as_deref(), Some("correct"));
    }

    #[test]
    fn test_connect_rejects_bad_requests() {
        let mut editor = LessonEditor::new(meta("l"));
        let pick = editor.add_node(NodeKind::Choice).unwrap();
        let quiz = editor.add_node(NodeKind::Quiz).unwrap();
        let done = editor.add_node(NodeKind::End).unwrap();
        let options = option_ids(&editor, &pick);

        editor.connect(&pick, Some(options[0].as_str()), &done).unwrap();
        assert!(matches!(
            editor.connect(&pick, Some(options[0].as_str()), &done),
            Err(EditorError::DuplicateEdge { .. })
        ));
        assert!(matches!(
            editor.connect(&pick, Some("nope"), &done),
            Err(EditorError::Port(PortError::PortNotFound { .. }))
        ));
        assert!(matches!(
            editor.connect(&quiz, Some("maybe"), &done),
            Err(EditorError::Port(PortError::PortNotFound { .. }))
        ));
        assert!(matches!(
            editor.connect(&done, None, &pick),
            Err(EditorError::Validation(ValidationError::InvalidNode { .. }))
        ));
        assert!(matches!(
            editor.connect(&pick, None, "ghost"),
            Err(EditorError::NodeNotFound(_))
        ));
        assert_eq!(editor.graph().edges.len(), 1);
    }

    #[test]
    fn test_remove_port_deletes_orphans_by_default() {
        let mut editor = LessonEditor::new(meta("l"));
        let pick = editor.add_node(NodeKind::Choice).unwrap();
        let a = editor.add_node(NodeKind::End).unwrap();
        let b = editor.add_node(NodeKind::End).unwrap();
        let options = option_ids(&editor, &pick);
        let ea = editor.connect(&pick, Some(options[0].as_str()), &a).unwrap();
        let eb = editor.connect(&pick, Some(options[1].as_str()), &b).unwrap();

        let removed = editor.remove_port(&pick, &options[0]).unwrap();
        assert_eq!(removed, vec![ea]);
        assert_eq!(option_ids(&editor, &pick), vec![options[1].clone()]);
        assert!(editor.graph().edge(&eb).is_some());
    }

    #[test]
    fn test_remove_port_can_keep_orphans() {
        let mut editor =
            LessonEditor::new(meta("l")).with_config(EditorConfig {
                orphan_policy: OrphanPolicy::Keep,
            });
        let pick = editor.add_node(NodeKind::Choice).unwrap();
        let a = editor.add_node(NodeKind::End).unwrap();
        let b = editor.add_node(NodeKind::End).unwrap();
        let options = option_ids(&editor, &pick);
        let ea = editor.connect(&pick, Some(options[0].as_str()), &a).unwrap();
        editor.connect(&pick, Some(options[1].as_str()), &b).unwrap();

        assert!(editor.remove_port(&pick, &options[0]).unwrap().is_empty());
        let warnings = editor.warnings().unwrap();
        assert!(warnings.iter().any(
            |w| matches!(w, GraphWarning::OrphanEdge { edge_id, .. } if *edge_id == ea)
        ));

        // The orphan never matches; the learner can still leave through the live option.
        let mut engine = TraversalEngine::new();
        engine.start(editor.into_graph()).unwrap();
        let step = engine
            .advance(Some(format!("choice-out-{}", options[1]).as_str()))
            .unwrap();
        assert_eq!(step.target(), Some(b.as_str()));
    }

    #[test]
    fn test_port_edits() {
        let mut editor = LessonEditor::new(meta("l"));
        let quiz = editor.add_node(NodeKind::Quiz).unwrap();
        let answer = editor.add_port(&quiz, PortKind::Option).unwrap();
        editor.set_port_text(&quiz, &answer, "Phobos").unwrap();
        editor.set_answer_correct(&quiz, &answer, true).unwrap();
        editor.set_label(&quiz, "Moons").unwrap();

        let node = editor.graph().node(&quiz).unwrap();
        assert_eq!(node.label, "Moons");
        let port = node.find_port(&answer).unwrap().1;
        assert_eq!(port.text, "Phobos");
        assert_eq!(port.correct, Some(true));
    }

    #[test]
    fn test_invalid_edits_are_not_applied() {
        let mut editor = LessonEditor::new(meta("l"));
        let act = editor.add_node(NodeKind::Activity).unwrap();
        let result = editor.edit_node(&act, |node| {
            if let NodeContent::Activity(data) = &mut node.content {
                data.configuration = "[1, 2]".to_string();
            }
        });
        assert!(matches!(result, Err(EditorError::Validation(_))));
        match &editor.graph().node(&act).unwrap().content {
            NodeContent::Activity(data) => assert_eq!(data.configuration, "{}"),
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_remove_node_drops_touching_edges() {
        let mut editor = LessonEditor::new(meta("l"));
        let a = editor.add_node(NodeKind::Narration).unwrap();
        let b = editor.add_node(NodeKind::Narration).unwrap();
        let c = editor.add_node(NodeKind::End).unwrap();
        editor.connect(&a, None, &b).unwrap();
        editor.connect(&b, None, &c).unwrap();

        editor.remove_node(&b).unwrap();
        assert!(editor.graph().edges.is_empty());
        assert_eq!(editor.graph().nodes.len(), 2);
        assert!(matches!(
            editor.disconnect("missing"),
            Err(EditorError::EdgeNotFound(_))
        ));
    }

    #[test]
    fn test_memory_store_follows_every_mutation() {
        let store = Arc::new(MemoryStore::new());
        let mut editor = LessonEditor::new(meta("mars")).with_store(store.clone());
        editor.save().unwrap();

        let a = editor.add_node(NodeKind::Narration).unwrap();
        let b = editor.add_node(NodeKind::End).unwrap();
        let edge = editor.connect(&a, None, &b).unwrap();
        editor.set_label(&a, "Hello").unwrap();
        assert_eq!(&store.fetch_graph("mars").unwrap(), editor.graph());

        editor.disconnect(&edge).unwrap();
        assert!(store.fetch_graph("mars").unwrap().edges.is_empty());
        assert_eq!(store.lesson_ids().unwrap(), vec!["mars".to_string()]);
    }

    #[test]
    fn test_store_errors_block_the_mutation() {
        // Nothing was saved yet, so the store does not know the lesson.
        let store = Arc::new(MemoryStore::new());
        let mut editor = LessonEditor::new(meta("unsaved")).with_store(store);
        assert!(matches!(
            editor.add_node(NodeKind::Narration),
            Err(EditorError::Store(StoreError::LessonNotFound(_)))
        ));
        assert!(editor.graph().nodes.is_empty());
    }

    #[test]
    fn test_json_dir_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonDirStore::new(dir.path()).unwrap());

        let mut editor = LessonEditor::new(meta("venus")).with_store(store.clone());
        editor.save().unwrap();
        let q = editor.add_node(NodeKind::Quiz).unwrap();
        let done = editor.add_node(NodeKind::End).unwrap();
        editor.connect(&q, Some("incorrect"), &done).unwrap();
        assert!(dir.path().join("venus.json").exists());

        let reopened = LessonEditor::open(store.clone(), "venus").unwrap();
        assert_eq!(reopened.graph(), editor.graph());
        assert!(matches!(
            store.fetch_graph("jupiter"),
            Err(StoreError::LessonNotFound(_))
        ));
        assert!(matches!(
            store.fetch_graph("../etc"),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_json_dir_store_upgrades_legacy_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mars-101.json"), LEGACY_LESSON_JSON).unwrap();
        let store = JsonDirStore::new(dir.path()).unwrap();

        let graph = store.fetch_graph("mars-101").unwrap();
        assert_eq!(graph.nodes.len(), 5);
        assert!(graph.edges.iter().all(|e| !e.id.is_empty()));
    }

    #[test]
    fn test_json_dir_store_keeps_upgraded_port_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mars-101.json");
        std::fs::write(&path, LEGACY_LESSON_JSON).unwrap();
        let store = Arc::new(JsonDirStore::new(dir.path()).unwrap());

        let first = store.fetch_graph("mars-101").unwrap();
        let second = store.fetch_graph("mars-101").unwrap();
        assert_eq!(second, first);
        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains(&format!("\"schemaVersion\": {}", CURRENT_SCHEMA_VERSION)));

        // Per-node writes re-read the file; the edge below must still match its option.
        let mut editor = LessonEditor::open(store.clone(), "mars-101").unwrap();
        editor.set_label("intro", "Briefing").unwrap();
        let added = editor.add_port("pick", PortKind::Option).unwrap();
        let edge = editor.connect("pick", Some(added.as_str()), "done").unwrap();

        let stored = store.fetch_graph("mars-101").unwrap();
        assert_eq!(&stored, editor.graph());
        assert!(!validate_graph(&stored).unwrap().iter().any(
            |w| matches!(w, GraphWarning::OrphanEdge { edge_id, .. } if *edge_id == edge)
        ));
    }

    #[test]
    fn test_failed_node_delete_leaves_the_editor_untouched() {
        let store = Arc::new(FlakyStore::default());
        let mut editor = LessonEditor::new(meta("l")).with_store(store.clone());
        editor.save().unwrap();
        let a = editor.add_node(NodeKind::Narration).unwrap();
        let b = editor.add_node(NodeKind::Narration).unwrap();
        let c = editor.add_node(NodeKind::End).unwrap();
        editor.connect(&a, None, &b).unwrap();
        editor.connect(&b, None, &c).unwrap();
        let before = editor.graph().clone();

        store.fail_node_deletes.store(true, Ordering::SeqCst);
        assert!(matches!(
            editor.remove_node(&b),
            Err(EditorError::Store(StoreError::Backend(_)))
        ));
        assert_eq!(editor.graph(), &before);

        store.fail_node_deletes.store(false, Ordering::SeqCst);
        editor.remove_node(&b).unwrap();
        assert_eq!(&store.fetch_graph("l").unwrap(), editor.graph());
    }

    #[test]
    fn test_failed_edge_delete_keeps_the_port() {
        let store = Arc::new(FlakyStore::default());
        let mut editor = LessonEditor::new(meta("l")).with_store(store.clone());
        editor.save().unwrap();
        let pick = editor.add_node(NodeKind::Choice).unwrap();
        let done = editor.add_node(NodeKind::End).unwrap();
        let options = option_ids(&editor, &pick);
        let edge = editor.connect(&pick, Some(options[0].as_str()), &done).unwrap();

        store.fail_edge_deletes.store(true, Ordering::SeqCst);
        assert!(editor.remove_port(&pick, &options[0]).is_err());
        assert_eq!(option_ids(&editor, &pick), options);
        assert!(editor.graph().edge(&edge).is_some());
    }

    #[test]
    fn test_blank_label_is_rejected() {
        let mut editor = LessonEditor::new(meta("l"));
        let id = editor.add_node(NodeKind::Narration).unwrap();
        assert!(matches!(
            editor.set_label(&id, "   "),
            Err(EditorError::Validation(ValidationError::MissingField { .. }))
        ));
        assert_eq!(editor.graph().node(&id).unwrap().label, "New Narration");
    }
}
