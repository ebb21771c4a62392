use clap::Parser;
use lessonflow::authoring::LessonEditor;
use lessonflow::config::AllocatorConfig;
use lessonflow::lesson::{LessonMeta, NodeKind, PortKind};
use lessonflow::ports::PortAllocator;
use lessonflow::record::LessonRecord;
use lessonflow::schema::{CORRECT_HANDLE, INCORRECT_HANDLE};
use lessonflow::store::{LessonStore, MemoryStore};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CONTENT_KINDS: [NodeKind; 5] = [
    NodeKind::Narration,
    NodeKind::Quiz,
    NodeKind::Choice,
    NodeKind::AiTrigger,
    NodeKind::Activity,
];

/// A CLI tool to generate random, valid lessons for manual and load testing
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated lesson JSON to
    #[arg(short, long, default_value = "generated_lesson.json")]
    output: String,

    /// Number of content nodes between start and end
    #[arg(short, long, default_value_t = 20)]
    nodes: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Chance that a choice node gets an extra option
    #[arg(long, default_value_t = 0.3)]
    extra_option_chance: f64,
}

/// An unconnected exit: a node plus the port (or quiz result) to branch from.
struct OpenExit {
    node_id: String,
    port: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lessonflow=info")),
        )
        .init();

    let cli = Cli::parse();
    if !(0.0..=1.0).contains(&cli.extra_option_chance) {
        eprintln!(
            "Error: --extra-option-chance ({}) must be between 0 and 1",
            cli.extra_option_chance
        );
        std::process::exit(1);
    }

    let seed = cli.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    println!(
        "Generating a lesson with {} content nodes (seed {})...",
        cli.nodes, seed
    );

    let lesson = LessonMeta {
        id: format!("generated-{}", seed),
        title: format!("Generated lesson {}", seed),
        description: Some("Random lesson produced by lesson-gen".to_string()),
    };
    let store = Arc::new(MemoryStore::new());
    let mut editor = LessonEditor::new(lesson.clone())
        .with_allocator(PortAllocator::seeded(AllocatorConfig::default(), seed))
        .with_store(store.clone());
    editor.save()?;

    let start = editor.add_node(NodeKind::Start)?;
    let mut open = vec![OpenExit {
        node_id: start,
        port: None,
    }];

    for _ in 0..cli.nodes {
        let kind = *CONTENT_KINDS.choose(&mut rng).unwrap_or(&NodeKind::Narration);
        let node_id = editor.add_node(kind)?;

        if kind == NodeKind::Choice && rng.random_bool(cli.extra_option_chance) {
            let port_id = editor.add_port(&node_id, PortKind::Option)?;
            editor.set_port_text(&node_id, &port_id, "Path C")?;
        }

        let exit = open.swap_remove(rng.random_range(0..open.len()));
        editor.connect(&exit.node_id, exit.port.as_deref(), &node_id)?;
        open.extend(exits_of(&editor, &node_id, kind));
    }

    let end = editor.add_node(NodeKind::End)?;
    for exit in open {
        editor.connect(&exit.node_id, exit.port.as_deref(), &end)?;
    }

    let warnings = editor.warnings()?;
    if !warnings.is_empty() {
        println!("-> {} warning(s) in the generated graph.", warnings.len());
    }

    let graph = store.fetch_graph(&lesson.id)?;
    let json_output = LessonRecord::from(&graph).to_json_pretty()?;
    fs::write(&cli.output, json_output)?;

    println!(
        "Successfully generated {} nodes and {} edges into '{}'",
        graph.nodes.len(),
        graph.edges.len(),
        cli.output
    );

    Ok(())
}

fn exits_of(editor: &LessonEditor, node_id: &str, kind: NodeKind) -> Vec<OpenExit> {
    let exit = |port: Option<String>| OpenExit {
        node_id: node_id.to_string(),
        port,
    };
    match kind {
        NodeKind::Quiz => vec![
            exit(Some(CORRECT_HANDLE.to_string())),
            exit(Some(INCORRECT_HANDLE.to_string())),
        ],
        NodeKind::Choice | NodeKind::Activity => editor
            .graph()
            .node(node_id)
            .map(|node| {
                node.outgoing_ports()
                    .iter()
                    .map(|p| exit(Some(p.id.clone())))
                    .collect()
            })
            .unwrap_or_default(),
        _ => vec![exit(None)],
    }
}
