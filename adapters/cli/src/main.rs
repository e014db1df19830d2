#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Pipe Flow levels headlessly.

mod layout;
mod layout_transfer;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use layout::Layout;
use layout_transfer::LayoutSnapshot;
use pipeflow_core::{CellCoord, Command as GridCommand, Difficulty, Event, Phase};
use pipeflow_system_pipe_factory::PipeFactory;
use pipeflow_system_session::{LevelCatalog, Session, SessionConfig};
use serde::Serialize;

const TICK: Duration = Duration::from_millis(100);
const SIMULATION_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Parser)]
#[command(name = "pipeflow")]
#[command(about = "Headless runner for the Pipe Flow routing puzzle", long_about = None)]
struct Cli {
    /// Log every placement and flow step.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// List the built-in levels.
    Levels {
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print a reproducible stream of pieces.
    Queue {
        /// Seed for the piece generator.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Number of pieces to print.
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
    /// Play a level with a prepared layout until the water finishes.
    Run(RunArgs),
    /// Print a layout file as a single-line share string.
    Encode {
        /// Layout TOML file.
        #[arg(long)]
        layout: PathBuf,
    },
    /// Print a share string as layout TOML.
    Decode {
        /// Share string produced by `encode`.
        #[arg(long = "layout-string")]
        layout_string: String,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Built-in level played without any pipes.
    #[arg(long, conflicts_with_all = ["layout", "layout_string"])]
    level: Option<u32>,
    /// Layout TOML file.
    #[arg(long, conflicts_with = "layout_string")]
    layout: Option<PathBuf>,
    /// Share string produced by `encode`.
    #[arg(long = "layout-string")]
    layout_string: Option<String>,
    /// Difficulty governing the flow speed.
    #[arg(long, value_enum, default_value_t = DifficultyArg::Medium)]
    difficulty: DifficultyArg,
    /// Double the flow speed once the water is released.
    #[arg(long)]
    fast: bool,
    /// Seed for the piece generator; drawn from the OS when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(value: DifficultyArg) -> Self {
        match value {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Medium => Self::Medium,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

#[derive(Debug, Serialize)]
struct LevelRow {
    id: u32,
    size: u32,
    start: CellCoord,
    end: CellCoord,
    flow_ms: [u128; 3],
}

#[derive(Debug, Serialize)]
struct RunReport {
    level: u32,
    difficulty: Difficulty,
    outcome: Phase,
    path: Vec<CellCoord>,
    score: u32,
    time_remaining: u32,
}

/// Entry point for the Pipe Flow command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        let _ = logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let catalog = LevelCatalog::builtin();
    match cli.command {
        CliCommand::Levels { format } => list_levels(&catalog, format),
        CliCommand::Queue { seed, count } => print_queue(seed, count),
        CliCommand::Run(args) => run(&catalog, &args),
        CliCommand::Encode { layout } => {
            let layout = Layout::load(&layout)?;
            let level = layout.resolve(&catalog)?;
            let snapshot = LayoutSnapshot {
                grid: *level.descriptor(),
                pipes: layout.pipes,
            };
            println!("{}", snapshot.encode()?);
            Ok(())
        }
        CliCommand::Decode { layout_string } => {
            let layout = LayoutSnapshot::decode(&layout_string)
                .context("invalid layout string")?
                .into_layout();
            print!("{}", layout.to_toml()?);
            Ok(())
        }
    }
}

fn list_levels(catalog: &LevelCatalog, format: Format) -> Result<()> {
    let rows: Vec<LevelRow> = catalog
        .levels()
        .iter()
        .map(|level| LevelRow {
            id: level.id(),
            size: level.descriptor().size,
            start: level.descriptor().start.cell(),
            end: level.descriptor().end.cell(),
            flow_ms: [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
                .map(|difficulty| level.flow_speed(difficulty).as_millis()),
        })
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        Format::Text => {
            for row in rows {
                println!(
                    "level {:>2}  {:>2}x{:<2}  start ({}, {})  end ({}, {})  flow {}/{}/{} ms",
                    row.id,
                    row.size,
                    row.size,
                    row.start.row(),
                    row.start.col(),
                    row.end.row(),
                    row.end.col(),
                    row.flow_ms[0],
                    row.flow_ms[1],
                    row.flow_ms[2]
                );
            }
        }
    }
    Ok(())
}

fn print_queue(seed: u64, count: usize) -> Result<()> {
    let mut factory = PipeFactory::from_seed(seed)?;
    for index in 1..=count {
        let piece = factory.next_piece();
        println!(
            "{index:>3}  {:<8} {:>3}",
            piece.shape.name(),
            piece.rotation.degrees()
        );
    }
    Ok(())
}

fn run(catalog: &LevelCatalog, args: &RunArgs) -> Result<()> {
    let layout = match (&args.level, &args.layout, &args.layout_string) {
        (Some(id), None, None) => Layout {
            level: Some(*id),
            grid: None,
            pipes: Vec::new(),
        },
        (None, Some(path), None) => Layout::load(path)?,
        (None, None, Some(value)) => LayoutSnapshot::decode(value)
            .context("invalid layout string")?
            .into_layout(),
        _ => bail!("exactly one of --level, --layout or --layout-string is required"),
    };
    let level = layout.resolve(catalog)?;
    let factory = match args.seed {
        Some(seed) => PipeFactory::from_seed(seed)?,
        None => PipeFactory::from_entropy()?,
    };
    let mut session = Session::new(
        &level,
        args.difficulty.into(),
        factory,
        SessionConfig::default(),
    )?;

    let mut events = Vec::new();
    for pipe in &layout.pipes {
        session.apply(
            GridCommand::PlacePipe {
                cell: pipe.cell(),
                piece: pipe.piece(),
            },
            &mut events,
        )?;
    }
    for event in events.drain(..) {
        if let Event::PipePlacementRejected { cell, reason, .. } = event {
            bail!(
                "pipe at ({}, {}) was rejected: {reason}",
                cell.row(),
                cell.col()
            );
        }
    }

    let mut simulated = Duration::ZERO;
    while !session.phase().is_terminal() {
        if simulated >= SIMULATION_LIMIT {
            bail!("simulation did not finish within {SIMULATION_LIMIT:?}");
        }
        session.tick(TICK, &mut events);
        simulated += TICK;
        if args.fast
            && session.phase() == Phase::Flowing
            && session.speed_multiplier() == 1
        {
            let _ = session.toggle_speed()?;
        }
        for event in events.drain(..) {
            log::debug!("{simulated:?}: {event:?}");
        }
    }

    let report = RunReport {
        level: session.level_id(),
        difficulty: session.difficulty(),
        outcome: session.phase(),
        path: session.engine().path().to_vec(),
        score: session.score().unwrap_or_default(),
        time_remaining: session.time_remaining(),
    };
    print_report(&report, args.format)
}

fn print_report(report: &RunReport, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
        Format::Text => {
            let outcome = match report.outcome {
                Phase::Success => "success",
                _ => "fail",
            };
            let path = report
                .path
                .iter()
                .map(|cell| format!("({}, {})", cell.row(), cell.col()))
                .collect::<Vec<_>>()
                .join(" -> ");
            println!("level {} on {:?}: {outcome}", report.level, report.difficulty);
            println!("path ({} cells): {path}", report.path.len());
            println!("score: {}", report.score);
            println!("time remaining: {}s", report.time_remaining);
        }
    }
    Ok(())
}
