//! CLI entry point for the water sort solver.
//!
//! Usage:
//!   water-sort-solver solve [options]
//!   water-sort-solver solve --deal <deal.json> [options]
//!   water-sort-solver solve --stdin [options]
//!
//! Options:
//!   --bottles <n>       Containers in a random deal (default: 5)
//!   --seed <n>          Seed for the random deal
//!   --output <file>     Write the report to a file instead of stdout
//!   --format <fmt>      text or json (default: text)
//!   --hash-only         Deduplicate on hash alone
//!   --slab-nodes <n>    Nodes per pool slab

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use water_sort_solver::{
    breadth_first_search, write_text_report, Deal, DealError, DedupMode, PuzzleState,
    SearchConfig, SearchOutcome, SolveOutput, DEFAULT_SLAB_NODES,
};

#[derive(Parser)]
#[command(name = "water-sort-solver")]
#[command(about = "Breadth-first solver for the water sort puzzle")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Deal (or load) a puzzle and print a shortest solution
    Solve {
        /// Number of containers in a random deal, two of them start empty
        #[arg(long, default_value = "5")]
        bottles: usize,

        /// Seed for the random deal (OS entropy when absent)
        #[arg(long)]
        seed: Option<u64>,

        /// Path to a deal JSON file instead of a random deal
        #[arg(long, value_name = "FILE", conflicts_with = "stdin")]
        deal: Option<PathBuf>,

        /// Read the deal JSON from stdin
        #[arg(long)]
        stdin: bool,

        /// Write the report to this file instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Report format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Treat equal hashes as equal states (faster, may miss solutions)
        #[arg(long)]
        hash_only: bool,

        /// Nodes per pool slab
        #[arg(long, default_value_t = DEFAULT_SLAB_NODES)]
        slab_nodes: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            bottles,
            seed,
            deal,
            stdin,
            output,
            format,
            hash_only,
            slab_nodes,
        } => {
            let initial = match load_initial(bottles, seed, deal, stdin) {
                Ok(state) => state,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(2);
                }
            };

            let config = SearchConfig {
                dedup: if hash_only {
                    DedupMode::HashOnly
                } else {
                    DedupMode::Exact
                },
                slab_nodes,
                ..SearchConfig::default()
            };

            let outcome = match breadth_first_search(&initial, &config) {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(2);
                }
            };

            if let Err(e) = write_report(&initial, &outcome, format, output) {
                eprintln!("Error writing report: {e}");
                return ExitCode::from(2);
            }

            if outcome.is_solved() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
    }
}

fn load_initial(
    bottles: usize,
    seed: Option<u64>,
    deal: Option<PathBuf>,
    stdin: bool,
) -> Result<PuzzleState, DealError> {
    if stdin {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|source| DealError::DealRead {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        return PuzzleState::from_deal(&Deal::from_json(&buffer)?);
    }
    if let Some(path) = deal {
        return PuzzleState::from_deal(&Deal::load(&path)?);
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let state = PuzzleState::random(bottles, &mut rng)?;
    info!(bottles, ?seed, "dealt random puzzle");
    Ok(state)
}

fn write_report(
    initial: &PuzzleState,
    outcome: &SearchOutcome,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> io::Result<()> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        OutputFormat::Text => write_text_report(&mut out, initial.len(), outcome)?,
        OutputFormat::Json => {
            let report = SolveOutput::new(initial, outcome);
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
    }
    out.flush()
}
