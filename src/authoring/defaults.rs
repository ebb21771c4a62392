use crate::lesson::{
    ActivityData, AiTriggerData, ChoiceData, NarrationData, Node, NodeContent, NodeKind, Port,
    QuizData, StartData, UiStyle,
};
use crate::ports::PortAllocator;

/// Builds a freshly created node of `kind` with its starter content and ports.
pub(super) fn default_node(id: String, kind: NodeKind, allocator: &mut PortAllocator) -> Node {
    let mut port = |text: &str| Port::with_text(allocator.generate_id(|_| false), text);

    let (label, content) = match kind {
        NodeKind::Narration => (
            "New Narration",
            NodeContent::Narration(NarrationData {
                text: String::new(),
                outputs: vec![port("")],
            }),
        ),
        NodeKind::Quiz => {
            let mut first = port("Answer 1");
            first.correct = Some(true);
            let mut second = port("Answer 2");
            second.correct = Some(false);
            (
                "New Quiz",
                NodeContent::Quiz(QuizData {
                    question: String::new(),
                    answers: vec![first, second],
                }),
            )
        }
        NodeKind::Choice => (
            "New Choice",
            NodeContent::Choice(ChoiceData {
                prompt: "Make a choice:".to_string(),
                options: vec![port("Path A"), port("Path B")],
                ui_style: UiStyle::Buttons,
            }),
        ),
        NodeKind::AiTrigger => (
            "AI Analysis",
            NodeContent::AiTrigger(AiTriggerData {
                ai_action: "analyze_behavior".to_string(),
                fallback_text: "You've got this, let's keep going!".to_string(),
                outputs: vec![port("")],
            }),
        ),
        NodeKind::Activity => (
            "New Activity",
            NodeContent::Activity(ActivityData {
                activity_id: String::new(),
                prompt: String::new(),
                configuration: "{}".to_string(),
                options: vec![port("Success"), port("Failure")],
            }),
        ),
        NodeKind::Start => (
            "Lesson Start",
            NodeContent::Start(StartData {
                outputs: vec![port("")],
            }),
        ),
        NodeKind::End => ("Lesson End", NodeContent::End),
    };

    let inputs = match kind {
        NodeKind::Start => Vec::new(),
        _ => vec![port("")],
    };
    Node::new(id, label, content).with_inputs(inputs)
}
