use clap::Parser;
use std::path::PathBuf;
use std::process::exit;

use lumen::error::EngineError;
use lumen::registry::Registry;
use lumen::session::{self, RunOptions, Session};

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitStage {
    /// Run the frame loop
    Run,
    /// Print the parsed script in canonical form
    Ast,
    /// Print the nodes in update order
    Graph,
    /// Print the node network as Graphviz DOT
    Dot,
}

#[derive(Parser, Debug)]
#[command(
    name = "lumen",
    version,
    about = "Lumen — runs dataflow scripts as live, per-frame evaluated node graphs"
)]
struct Cli {
    /// Input .lum script
    script: PathBuf,

    /// Build and set up the graph without running frames
    #[arg(long)]
    dry_run: bool,

    /// Time every node and frame; summary is logged at exit
    #[arg(long)]
    profile: bool,

    /// Target frame rate (0 runs unpaced)
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::Run)]
    emit: EmitStage,

    /// Write the profile report as JSON (implies --profile)
    #[arg(long)]
    profile_out: Option<PathBuf>,

    /// Log lifecycle events
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("{}", failure_message(&e));
        exit(e.exit_code());
    }
}

/// One-line summary of a fatal error. Script diagnostics are already logged
/// where they arise and are not repeated here.
fn failure_message(e: &EngineError) -> String {
    format!("lumen: error: {e}")
}

fn run(cli: &Cli) -> Result<(), EngineError> {
    // ── Parse only ──
    if let EmitStage::Ast = cli.emit {
        let source =
            std::fs::read_to_string(&cli.script).map_err(|e| EngineError::io(&cli.script, e))?;
        let parsed = lumen::parser::parse(&source);
        match parsed.unit {
            Some(unit) if parsed.errors.is_empty() => {
                print!("{unit}");
                return Ok(());
            }
            _ => {
                lumen::diag::emit_all(&parsed.errors);
                return Err(EngineError::Parse {
                    errors: parsed.errors,
                })
            }
        }
    }

    let registry = Registry::with_builtins()?;
    let mut session = Session::load_file(&cli.script, &registry)?;

    match cli.emit {
        EmitStage::Dot => {
            print!("{}", lumen::dot::emit_dot(session.world()));
            Ok(())
        }
        EmitStage::Graph => {
            for (i, path) in graph_listing(&mut session)?.iter().enumerate() {
                println!("{i:>3}  {path}");
            }
            Ok(())
        }
        EmitStage::Ast | EmitStage::Run => {
            let options = RunOptions {
                dry_run: cli.dry_run,
                profile: cli.profile || cli.profile_out.is_some(),
                fps: cli.fps,
                frames: cli.frames,
            };
            let summary = session.run(&options)?;
            if let (Some(path), Some(report)) = (&cli.profile_out, &summary.profile) {
                session::write_report(report, path)?;
            }
            Ok(())
        }
    }
}

/// Node paths in update order.
fn graph_listing(session: &mut Session) -> Result<Vec<String>, EngineError> {
    session.build()?;
    Ok(session
        .graph()
        .map(|graph| graph.describe(session.world()))
        .unwrap_or_default())
}
