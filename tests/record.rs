//! Persisted format tests
//!
//! Loading, versioned upgrade, round trips through JSON and binary artifacts.
mod common;
use common::*;
use lessonflow::engine::TraversalEngine;
use lessonflow::error::{ArtifactError, RecordError, ValidationError};
use lessonflow::lesson::{
    CURRENT_SCHEMA_VERSION, IntoLesson, LessonBundle, NodeContent, NodeKind, SessionSnapshot,
};
use lessonflow::config::AllocatorConfig;
use lessonflow::ports::PortAllocator;
use lessonflow::record::{EdgeRecord, LessonRecord, PortRecord, load_lesson_json, upgrade};
use lessonflow::schema::GraphWarning;
use tempfile::tempdir;

#[cfg(test)]
mod record_tests {
    use super::*;

    fn load_legacy() -> lessonflow::record::LoadedLesson {
        load_lesson_json(LEGACY_LESSON_JSON, &mut PortAllocator::new()).unwrap()
    }

    #[test]
    fn test_legacy_document_loads_and_plays() {
        let loaded = load_legacy();
        assert_eq!(loaded.upgrade.from_version, 1);
        assert_eq!(loaded.upgrade.rewritten_handles, 3);
        assert_eq!(loaded.upgrade.assigned_edge_ids, 1);

        let graph = &loaded.graph;
        assert_eq!(graph.node("game").unwrap().kind(), NodeKind::Activity);
        match &graph.node("q1").unwrap().content {
            NodeContent::Quiz(quiz) => {
                assert_eq!(quiz.answers.len(), 2);
                assert_eq!(quiz.answers[0].correct, Some(true));
            }
            other => panic!("expected a quiz, got {:?}", other),
        }

        let land = graph.node("pick").unwrap().outgoing_ports()[1].id.clone();
        let mut engine = TraversalEngine::new();
        engine.start(loaded.graph.clone()).unwrap();
        engine.advance(None).unwrap();
        let step = engine
            .advance(Some(format!("choice-out-{}", land).as_str()))
            .unwrap();
        assert_eq!(step.target(), Some("game"));
    }

    #[test]
    fn test_legacy_document_reports_warnings() {
        let loaded = load_legacy();
        assert!(loaded.warnings.contains(&GraphWarning::OrphanEdge {
            edge_id: "e7".to_string(),
            node_id: "game".to_string(),
            handle: "0".to_string(),
        }));
        assert!(loaded.warnings.contains(&GraphWarning::AmbiguousEntry { candidates: vec![] }));
    }

    #[test]
    fn test_json_round_trip_preserves_graph() {
        let loaded = load_legacy();
        let json = LessonRecord::from(&loaded.graph).to_json_pretty().unwrap();
        assert!(json.contains(&format!("\"schemaVersion\": {}", CURRENT_SCHEMA_VERSION)));

        let reloaded = load_lesson_json(&json, &mut PortAllocator::new()).unwrap();
        assert!(reloaded.upgrade.is_noop());
        assert_eq!(reloaded.graph, loaded.graph);
    }

    #[test]
    fn test_round_trip_of_built_graph() {
        let graph = graph(
            vec![
                narration("start"),
                quiz("q"),
                activity("act", &["win", "lose"]),
                end("done"),
            ],
            vec![
                edge("e1", "start", "q", None),
                edge("e2", "q", "act", Some("correct")),
                edge("e3", "q", "done", Some("incorrect")),
                edge("e4", "act", "done", Some("activity-out-win")),
            ],
        );
        let record = LessonRecord::from(&graph);
        let back = record.into_lesson().unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn test_bundle_round_trip() {
        let graph = load_legacy().graph;
        let bundle = LessonBundle::new(graph.clone());
        let bytes = bundle.to_bytes().unwrap();
        assert_eq!(LessonBundle::from_bytes(&bytes).unwrap().graph, graph);

        let dir = tempdir().unwrap();
        let path = dir.path().join("lesson.bin");
        let path = path.to_str().unwrap();
        bundle.save(path).unwrap();
        assert_eq!(LessonBundle::from_file(path).unwrap(), bundle);
    }

    #[test]
    fn test_corrupt_bundle_is_an_error() {
        assert!(matches!(
            LessonBundle::from_bytes(&[0xff, 0x01]),
            Err(ArtifactError::Generic(_))
        ));
    }

    #[test]
    fn test_session_snapshot_round_trip() {
        let graph = branching_graph();
        let mut engine = TraversalEngine::new();
        engine.start(graph.clone()).unwrap();
        engine.advance(None).unwrap();
        engine.record_answer("c1", 1usize).unwrap();

        let snapshot = SessionSnapshot::new("test", engine.session().unwrap().clone());
        let bytes = snapshot.to_bytes().unwrap();
        let restored = SessionSnapshot::from_bytes(&bytes).unwrap();
        assert_eq!(restored, snapshot);

        let session = restored.restore_into(&graph).unwrap();
        let mut resumed = TraversalEngine::new();
        resumed.resume(graph, session).unwrap();
        assert_eq!(resumed.history(), ["start", "c1"]);
    }

    #[test]
    fn test_snapshot_for_another_lesson_is_rejected() {
        let graph = branching_graph();
        let mut engine = TraversalEngine::new();
        engine.start(graph.clone()).unwrap();
        let snapshot = SessionSnapshot::new("elsewhere", engine.session().unwrap().clone());
        assert!(matches!(
            snapshot.restore_into(&graph),
            Err(ArtifactError::LessonMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let json = r#"{ "nodes": [ { "id": "x", "type": "hologram", "data": {} } ] }"#;
        let err = load_lesson_json(json, &mut PortAllocator::new()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Validation(ValidationError::UnknownNodeType { .. })
        ));
    }

    #[test]
    fn test_dangling_edge_is_rejected() {
        let json = r#"{
            "schemaVersion": 2,
            "nodes": [
                { "id": "a", "type": "end", "data": { "label": "A", "inputs": [{ "id": "i" }] } }
            ],
            "edges": [ { "id": "e", "source": "ghost", "target": "a" } ]
        }"#;
        let err = load_lesson_json(json, &mut PortAllocator::new()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Validation(ValidationError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let err = load_lesson_json("{ nodes: ", &mut PortAllocator::new()).unwrap_err();
        assert!(matches!(err, RecordError::JsonParse(_)));
    }

    #[test]
    fn test_un_upgraded_record_cannot_be_converted() {
        let record = LessonRecord::from_json(
            r#"{ "nodes": [ { "id": "c", "type": "choice", "data": { "options": ["A"] } } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            record.into_lesson(),
            Err(RecordError::Validation(ValidationError::LegacyPorts { .. }))
        ));
    }

    #[test]
    fn test_node_without_label_is_rejected() {
        let json = r#"{
            "schemaVersion": 2,
            "nodes": [ { "id": "a", "type": "end", "data": { "inputs": [{ "id": "i" }] } } ]
        }"#;
        let err = load_lesson_json(json, &mut PortAllocator::new()).unwrap_err();
        assert!(matches!(
            err,
            RecordError::Validation(ValidationError::MissingField { field, .. }) if field == "label"
        ));
    }

    fn option_id(record: &LessonRecord, node: usize, index: usize) -> String {
        record.nodes[node].data.options.as_ref().unwrap()[index]
            .id()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_upgrade_rewrites_legacy_handles_by_position() {
        let mut record = LessonRecord::from_json(LEGACY_LESSON_JSON).unwrap();
        let mut allocator = PortAllocator::seeded(AllocatorConfig::default(), 11);
        let report = upgrade(&mut record, &mut allocator);

        assert_eq!(report.from_version, 1);
        assert_eq!(record.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(
            record.edges[2].source_handle,
            Some(format!("choice-out-{}", option_id(&record, 1, 1)))
        );
        assert_eq!(
            record.edges[5].source_handle,
            Some(format!("activity-out-{}", option_id(&record, 3, 0)))
        );
        assert!(record.edges[5].id.starts_with("edge-"));
        assert_eq!(record.edges[3].source_handle.as_deref(), Some("correct"));
    }

    #[test]
    fn test_second_upgrade_is_a_noop() {
        let mut record = LessonRecord::from_json(LEGACY_LESSON_JSON).unwrap();
        let mut allocator = PortAllocator::seeded(AllocatorConfig::default(), 3);
        upgrade(&mut record, &mut allocator);
        let once = record.clone();

        let report = upgrade(&mut record, &mut allocator);
        assert!(report.is_noop());
        assert_eq!(record, once);
    }

    #[test]
    fn test_handles_are_coerced_to_strings() {
        let edges: Vec<EdgeRecord> = serde_json::from_str(
            r#"[
                { "id": "a", "source": "n1", "target": "n2", "sourceHandle": 3 },
                { "id": "b", "source": "n1", "target": "n2", "sourceHandle": null },
                { "id": "c", "source": "n1", "target": "n2", "source_handle": "  " },
                { "id": "d", "source": "n1", "target": "n2", "sourceHandle": true },
                { "id": "e", "source": "n1", "target": "n2" }
            ]"#,
        )
        .unwrap();
        let handles: Vec<_> = edges.iter().map(|e| e.source_handle.as_deref()).collect();
        assert_eq!(handles, vec![Some("3"), None, None, Some("true"), None]);
    }

    #[test]
    fn test_ports_accept_both_layouts() {
        let ports: Vec<PortRecord> =
            serde_json::from_str(r#"[ "Path A", { "id": "x1", "text": "Path B" }, { "id": "i1" } ]"#)
                .unwrap();
        assert!(ports[0].is_legacy());
        assert_eq!(ports[1].id(), Some("x1"));
        assert_eq!(
            ports[2],
            PortRecord::Port {
                id: "i1".into(),
                text: String::new(),
                correct: None
            }
        );
    }

    #[test]
    fn test_missing_version_means_legacy() {
        let record = LessonRecord::from_json(r#"{ "nodes": [] }"#).unwrap();
        assert_eq!(record.schema_version, 1);
    }
}
