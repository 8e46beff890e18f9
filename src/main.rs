//! Tracksim console
//!
//! Reads control commands from stdin and drives the orchestrator:
//!
//! ```text
//! <task> start | <task> stop   task: radar, decoy, sim, drone, rocket
//! start-all | stop-all
//! status
//! quit
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use tracksim::core::error::Result;
use tracksim::ingest::HttpIngestClient;
use tracksim::{Orchestrator, SimulationConfig, TaskKind};

#[derive(Parser, Debug)]
#[command(name = "tracksim")]
#[command(about = "Stream synthetic radar targets to a tracking service")]
struct Args {
    /// TOML configuration file (falls back to $TRACKSIM_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for deterministic scatter and object ids
    #[arg(long)]
    seed: Option<u64>,

    /// Tasks to start immediately, e.g. `--start radar --start sim`
    #[arg(long)]
    start: Vec<String>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tracksim=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = SimulationConfig::load(args.config.as_deref());
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    tracing::info!(
        url = %config.ingest.objects_url(),
        tick_secs = config.tick_interval_secs,
        timeout_ticks = config.inactivity_timeout_ticks(),
        "Tracksim starting"
    );

    let rt = Runtime::new()?;
    let _guard = rt.enter();

    let sink = Arc::new(HttpIngestClient::new(&config.ingest)?);
    let orchestrator = Orchestrator::new(config, sink);

    for name in &args.start {
        run_command(&orchestrator, &format!("{name} start"));
    }

    print_help();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "q" {
            break;
        }
        run_command(&orchestrator, input);
    }

    rt.block_on(orchestrator.shutdown());
    tracing::info!("Tracksim stopped");
    Ok(())
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  <task> start | <task> stop   tasks: {}", task_names());
    println!("  start-all | stop-all");
    println!("  status");
    println!("  quit");
    println!();
}

fn task_names() -> String {
    TaskKind::ALL.map(|k| k.as_str()).join(", ")
}

fn run_command(orchestrator: &Orchestrator, input: &str) {
    let words: Vec<&str> = input.split_whitespace().collect();
    match words.as_slice() {
        ["status"] | ["s"] => {
            for (kind, phase) in orchestrator.status_all() {
                match orchestrator.last_run(kind) {
                    Some(run) => println!(
                        "  {kind:<20} {phase:<9} last run: {} ticks, {} sent, {} radar points, {} suggested, {} failed ({})",
                        run.ticks, run.batches_sent, run.radar_points, run.suggestions, run.failed_sends, run.exit
                    ),
                    None => println!("  {kind:<20} {phase}"),
                }
            }
        }
        ["stop-all"] => println!("{}", orchestrator.stop_all()),
        ["start-all"] => {
            for (kind, outcome) in orchestrator.start_all() {
                match outcome {
                    Ok(outcome) => println!("  {kind}: {outcome}"),
                    Err(e) => println!("  {kind}: {e}"),
                }
            }
        }
        [task, action] | [action, task] if matches!(*action, "start" | "stop") => {
            let Some(kind) = TaskKind::parse(task) else {
                println!("Unknown task {task:?}; expected one of {}", task_names());
                return;
            };
            if *action == "start" {
                match orchestrator.start(kind) {
                    Ok(outcome) => println!("{kind}: {outcome}"),
                    Err(e) => println!("{kind}: {e}"),
                }
            } else {
                println!("{kind}: {}", orchestrator.stop(kind));
            }
        }
        _ => {
            println!("Unknown command: {input}");
            print_help();
        }
    }
}
