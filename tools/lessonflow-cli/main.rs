use clap::{Parser, Subcommand};
use lessonflow::config::LessonflowConfig;
use lessonflow::engine::{AnswerValue, Step, TraversalEngine};
use lessonflow::lesson::{LessonBundle, LessonGraph, Node, NodeContent, SessionSnapshot};
use lessonflow::ports::PortAllocator;
use lessonflow::record::{LessonRecord, LoadedLesson, load_lesson_json, upgrade};
use lessonflow::schema::{output_handle, quiz_handle};
use lessonflow::trace::PathFormatter;
use std::fs;
use std::io::{self, Write};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Validate, upgrade, bundle and play branching lessons
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a lesson document and report errors and warnings
    Validate {
        /// Path to the lesson JSON file
        lesson_path: String,
    },
    /// Rewrite a lesson document in the current schema version
    Migrate {
        lesson_path: String,
        /// Output path; defaults to overwriting the input
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Pack a validated lesson into a binary bundle
    Bundle {
        lesson_path: String,
        #[arg(short, long)]
        output: String,
    },
    /// Walk a lesson, either scripted or interactively
    Play {
        /// Lesson JSON file, or a bundle with `--bundle`
        lesson_path: String,

        /// Treat the input as a binary bundle
        #[arg(long)]
        bundle: bool,

        /// Comma-separated outcome tokens; `-` takes the default exit
        #[arg(short, long, value_delimiter = ',')]
        tokens: Vec<String>,

        /// Run in interactive mode to be prompted for each choice
        #[arg(short = 'i', long, help = "Run in interactive 'human' mode")]
        human: bool,

        /// Resume from a saved session snapshot
        #[arg(long)]
        resume: Option<String>,

        /// Save the session snapshot when play stops
        #[arg(long)]
        save_session: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lessonflow=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => LessonflowConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => LessonflowConfig::default(),
    };

    match cli.command {
        Command::Validate { lesson_path } => run_validate(&lesson_path, &config),
        Command::Migrate {
            lesson_path,
            output,
        } => run_migrate(&lesson_path, output.as_deref(), &config),
        Command::Bundle {
            lesson_path,
            output,
        } => run_bundle(&lesson_path, &output, &config),
        Command::Play {
            lesson_path,
            bundle,
            tokens,
            human,
            resume,
            save_session,
        } => {
            let graph = if bundle {
                LessonBundle::from_file(&lesson_path)
                    .unwrap_or_else(|e| exit_with_error(&format!("Failed to load bundle: {}", e)))
                    .graph
            } else {
                load(&lesson_path, &config).graph
            };
            run_play(graph, &config, tokens, human, resume, save_session);
        }
    }
}

fn load(path: &str, config: &LessonflowConfig) -> LoadedLesson {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read lesson file '{}': {}", path, e))
    });
    let mut allocator = PortAllocator::with_config(config.allocator.clone());
    load_lesson_json(&json, &mut allocator)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load lesson: {}", e)))
}

fn run_validate(path: &str, config: &LessonflowConfig) {
    let start = Instant::now();
    let loaded = load(path, config);
    let graph = &loaded.graph;

    println!("Lesson '{}' ({})", graph.lesson.title, graph.lesson.id);
    println!("  Nodes: {}", graph.nodes.len());
    println!("  Edges: {}", graph.edges.len());
    if !loaded.upgrade.is_noop() {
        println!(
            "  Upgraded from schema v{}: {} nodes migrated, {} handles rewritten, {} edge ids assigned",
            loaded.upgrade.from_version,
            loaded.upgrade.migrated_nodes,
            loaded.upgrade.rewritten_handles,
            loaded.upgrade.assigned_edge_ids
        );
    }
    if loaded.warnings.is_empty() {
        println!("  No warnings.");
    } else {
        println!("  {} warning(s):", loaded.warnings.len());
        for warning in &loaded.warnings {
            println!("    - {}", warning);
        }
    }
    println!("Validated in {:?}", start.elapsed());
}

fn run_migrate(path: &str, output: Option<&str>, config: &LessonflowConfig) {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read lesson file '{}': {}", path, e))
    });
    let mut record = LessonRecord::from_json(&json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse lesson JSON: {}", e)));
    let mut allocator = PortAllocator::with_config(config.allocator.clone());
    let report = upgrade(&mut record, &mut allocator);

    let text = record
        .to_json_pretty()
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize lesson: {}", e)));
    let target = output.unwrap_or(path);
    fs::write(target, text)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write '{}': {}", target, e)));

    if report.is_noop() {
        println!("'{}' is already current; written to '{}'.", path, target);
    } else {
        println!(
            "Upgraded '{}' from v{}: {} nodes migrated, {} handles rewritten, {} edge ids assigned -> '{}'",
            path,
            report.from_version,
            report.migrated_nodes,
            report.rewritten_handles,
            report.assigned_edge_ids,
            target
        );
    }
}

fn run_bundle(path: &str, output: &str, config: &LessonflowConfig) {
    let loaded = load(path, config);
    let nodes = loaded.graph.nodes.len();
    LessonBundle::new(loaded.graph)
        .save(output)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to write bundle: {}", e)));
    println!("Bundled {} nodes into '{}'.", nodes, output);
}

fn run_play(
    graph: LessonGraph,
    config: &LessonflowConfig,
    tokens: Vec<String>,
    human: bool,
    resume: Option<String>,
    save_session: Option<String>,
) {
    let mut engine = TraversalEngine::with_config(config.traversal.clone());
    let lesson_id = graph.lesson.id.clone();
    let started = match resume {
        Some(path) => {
            let session = SessionSnapshot::from_file(&path)
                .and_then(|snapshot| snapshot.restore_into(&graph))
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to restore session: {}", e)));
            engine.resume(graph, session)
        }
        None => engine.start(graph),
    };
    if let Err(e) = started {
        exit_with_error(&format!("Could not start lesson: {}", e));
    }

    println!("--- Playing '{}' ---", lesson_id);
    if human {
        play_interactive(&mut engine);
    } else {
        play_scripted(&mut engine, &tokens);
    }

    if let Some(graph) = engine.graph() {
        println!("\nPath: {}", PathFormatter::format_history(graph, engine.history()));
    }

    if let Some(path) = save_session {
        if let Some(session) = engine.session() {
            SessionSnapshot::new(lesson_id, session.clone())
                .save(&path)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to save session: {}", e)));
            println!("Session saved to '{}'.", path);
        }
    }
}

fn play_scripted(engine: &mut TraversalEngine, tokens: &[String]) {
    for token in tokens {
        let token = (token != "-").then_some(token.as_str());
        if !advance_and_report(engine, token) {
            return;
        }
    }
    // Drain remaining default exits so linear tails play out without tokens.
    let limit = engine.graph().map_or(0, |g| g.nodes.len());
    for _ in 0..limit {
        let Ok(step) = engine.peek(None) else { return };
        if step.is_no_path() || !advance_and_report(engine, None) {
            return;
        }
    }
}

fn play_interactive(engine: &mut TraversalEngine) {
    loop {
        let Some(node) = engine.current_node().cloned() else {
            return;
        };
        describe(&node);
        let Some((token, answer)) = prompt_for_outcome(&node) else {
            println!("Stopping.");
            return;
        };
        if let Some(answer) = answer {
            if let Err(e) = engine.record_answer(&node.id, answer) {
                exit_with_error(&format!("Could not record answer: {}", e));
            }
        }
        if !advance_and_report(engine, token.as_deref()) {
            return;
        }
    }
}

/// Advances once and prints the step. Returns `false` once the lesson cannot continue.
fn advance_and_report(engine: &mut TraversalEngine, token: Option<&str>) -> bool {
    match engine.advance(token) {
        Ok(step) => {
            println!("  {}", PathFormatter::format_step(&step));
            matches!(step, Step::Moved(_))
        }
        Err(e) => exit_with_error(&format!("Traversal failed: {}", e)),
    }
}

fn describe(node: &Node) {
    println!("\n[{}] {}", node.kind(), node.label);
    match &node.content {
        NodeContent::Narration(d) if !d.text.is_empty() => println!("  {}", d.text),
        NodeContent::Quiz(d) => println!("  {}", d.question),
        NodeContent::Choice(d) => println!("  {}", d.prompt),
        NodeContent::AiTrigger(d) => println!("  ({}) {}", d.ai_action, d.fallback_text),
        NodeContent::Activity(d) => println!("  Activity '{}': {}", d.activity_id, d.prompt),
        _ => {}
    }
}

/// Asks for the block's outcome. `None` means the user wants to stop.
fn prompt_for_outcome(node: &Node) -> Option<(Option<String>, Option<AnswerValue>)> {
    let ports = node.outgoing_ports();
    if !node.kind().is_branching() || ports.is_empty() {
        let line = prompt_for_input("Press Enter to continue (q to quit)", None);
        return (line != "q").then_some((None, None));
    }

    for (i, port) in ports.iter().enumerate() {
        println!("  {}: {}", i + 1, port.text);
    }
    loop {
        let line = prompt_for_input("Enter choice (q to quit)", Some("1"));
        if line == "q" {
            return None;
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=ports.len()).contains(&n) => {
                let port = &ports[n - 1];
                let token = match &node.content {
                    NodeContent::Quiz(_) => quiz_handle(port.correct.unwrap_or(false)).to_string(),
                    _ => output_handle(node.kind(), &port.id),
                };
                return Some((Some(token), Some(AnswerValue::Index(n - 1))));
            }
            _ => println!("Invalid choice. Please enter 1 to {}.", ports.len()),
        }
    }
}

/// A helper function to prompt the user and read a line of input.
fn prompt_for_input(prompt_text: &str, default: Option<&str>) -> String {
    let mut line = String::new();
    let default_prompt = default.map_or("".to_string(), |d| format!(" [default: {}]", d));

    print!("> {}{}: ", prompt_text, default_prompt);
    if let Err(e) = io::stdout().flush() {
        exit_with_error(&format!("Failed to flush stdout: {}", e));
    }
    if let Err(e) = io::stdin().read_line(&mut line) {
        exit_with_error(&format!("Failed to read line: {}", e));
    }
    let trimmed = line.trim().to_string();

    if trimmed.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        trimmed
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
