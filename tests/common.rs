//! Common test utilities for building lesson graphs and documents.
use lessonflow::lesson::{
    ActivityData, ChoiceData, Edge, LessonGraph, LessonMeta, NarrationData, Node, NodeContent,
    Port, QuizData,
};

#[allow(dead_code)]
pub fn meta(id: &str) -> LessonMeta {
    LessonMeta {
        id: id.to_string(),
        title: format!("Lesson {}", id),
        description: None,
    }
}

#[allow(dead_code)]
pub fn narration(id: &str) -> Node {
    Node::new(
        id,
        format!("Narration {}", id),
        NodeContent::Narration(NarrationData {
            text: format!("Text of {}", id),
            outputs: vec![Port::new(format!("{}-out", id))],
        }),
    )
    .with_inputs(vec![Port::new(format!("{}-in", id))])
}

/// A choice node whose options are `(port id, text)` pairs.
#[allow(dead_code)]
pub fn choice(id: &str, options: &[(&str, &str)]) -> Node {
    Node::new(
        id,
        format!("Choice {}", id),
        NodeContent::Choice(ChoiceData {
            prompt: "Pick one".to_string(),
            options: options
                .iter()
                .map(|(port, text)| Port::with_text(*port, *text))
                .collect(),
            ..Default::default()
        }),
    )
    .with_inputs(vec![Port::new(format!("{}-in", id))])
}

#[allow(dead_code)]
pub fn quiz(id: &str) -> Node {
    Node::new(
        id,
        format!("Quiz {}", id),
        NodeContent::Quiz(QuizData {
            question: "What is the red planet?".to_string(),
            answers: vec![
                Port::answer(format!("{}-a1", id), "Mars", true),
                Port::answer(format!("{}-a2", id), "Venus", false),
            ],
        }),
    )
    .with_inputs(vec![Port::new(format!("{}-in", id))])
}

#[allow(dead_code)]
pub fn activity(id: &str, outcomes: &[&str]) -> Node {
    Node::new(
        id,
        format!("Activity {}", id),
        NodeContent::Activity(ActivityData {
            activity_id: "lander".to_string(),
            prompt: "Land the rover".to_string(),
            configuration: r#"{"gravity":3.7}"#.to_string(),
            options: outcomes.iter().map(|o| Port::with_text(*o, *o)).collect(),
        }),
    )
    .with_inputs(vec![Port::new(format!("{}-in", id))])
}

#[allow(dead_code)]
pub fn end(id: &str) -> Node {
    Node::new(id, format!("End {}", id), NodeContent::End)
        .with_inputs(vec![Port::new(format!("{}-in", id))])
}

#[allow(dead_code)]
pub fn edge(id: &str, source: &str, target: &str, handle: Option<&str>) -> Edge {
    let edge = Edge::new(id, source, target);
    match handle {
        Some(h) => edge.with_source_handle(h),
        None => edge,
    }
}

#[allow(dead_code)]
pub fn graph(nodes: Vec<Node>, edges: Vec<Edge>) -> LessonGraph {
    LessonGraph {
        lesson: meta("test"),
        nodes,
        edges,
    }
}

/// `start` (narration) -> `c1` (choice o1/o2) -> `x` | `y`.
#[allow(dead_code)]
pub fn branching_graph() -> LessonGraph {
    graph(
        vec![
            narration("start"),
            choice("c1", &[("o1", "A"), ("o2", "B")]),
            end("x"),
            end("y"),
        ],
        vec![
            edge("e0", "start", "c1", None),
            edge("e1", "c1", "x", Some("choice-out-o1")),
            edge("e2", "c1", "y", Some("choice-out-o2")),
        ],
    )
}

/// A version 1 document: bare-string options, a legacy quiz and positional handles.
#[allow(dead_code)]
pub const LEGACY_LESSON_JSON: &str = r#"{
    "lesson": { "id": "mars-101", "title": "Mars 101" },
    "nodes": [
        { "id": "intro", "type": "narration",
          "data": { "label": "Intro", "text": "Welcome aboard." } },
        { "id": "pick", "type": "choice",
          "data": { "label": "Route", "prompt": "Where to?", "options": ["Orbit", "Land"] } },
        { "id": "q1", "type": "quiz",
          "data": { "label": "Check", "question": "Gravity on Mars?",
                    "options": ["3.7 m/s2", "9.8 m/s2"], "correctAnswer": "3.7 m/s2" } },
        { "id": "game", "type": "gameInteraction",
          "data": { "label": "Landing", "game_id": "lander", "configuration": { "fuel": 40 },
                    "options": ["Success", "Failure"] } },
        { "id": "done", "type": "end", "data": { "label": "Done" } }
    ],
    "edges": [
        { "id": "e1", "source": "intro", "target": "pick" },
        { "id": "e2", "source": "pick", "target": "q1", "sourceHandle": "choice-0-orbit" },
        { "id": "e3", "source": "pick", "target": "game", "sourceHandle": "choice-1-land" },
        { "id": "e4", "source": "q1", "target": "done", "sourceHandle": "correct" },
        { "id": "e5", "source": "q1", "target": "intro", "sourceHandle": "incorrect" },
        { "source": "game", "target": "done", "sourceHandle": "game-outcome-0-success" },
        { "id": "e7", "source": "game", "target": "pick", "sourceHandle": 0 }
    ]
}"#;
