//! Cartneat CLI - train and inspect cart-pole balancing controllers.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Cartneat - NEAT neuroevolution for cart-pole balancing
#[derive(Parser, Debug)]
#[command(name = "cartneat")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve controllers against the reference cart-pole
    Train {
        /// Directory for saved specimens
        #[arg(short, long, default_value = cartneat::neat::DEFAULT_STORE_DIR)]
        output: PathBuf,

        /// Genomes per generation (default: 50; invalid values are ignored)
        #[arg(long)]
        population_size: Option<String>,

        /// Generations to run (default: 50; invalid values are ignored)
        #[arg(short, long)]
        generations: Option<String>,

        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Fittest genomes carried forward each generation
        #[arg(long, default_value = "5")]
        champions: usize,

        /// Least fit genomes carried forward each generation
        #[arg(long, default_value = "1")]
        antichampions: usize,

        /// Fresh minimal genomes injected each generation
        #[arg(long, default_value = "0")]
        new_species: usize,

        /// Episode length cap in simulation ticks
        #[arg(long, default_value = "1000")]
        max_ticks: u64,

        /// Do not seed the first generation from the stored best genome
        #[arg(long)]
        fresh: bool,

        /// Suppress the progress bar and info logs
        #[arg(short, long)]
        quiet: bool,
    },

    /// Summarize a saved genome and optionally evaluate it
    Inspect {
        /// Genome JSON file
        #[arg(required = true)]
        file: PathBuf,

        /// Comma-separated input values to evaluate
        #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
        inputs: Option<Vec<f64>>,
    },

    /// Export a saved genome as Graphviz DOT
    Dot {
        /// Genome JSON file
        #[arg(required = true)]
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Promote the fittest generation snapshot to `best`
    SelectBest {
        /// Directory of saved specimens
        #[arg(short, long, default_value = cartneat::neat::DEFAULT_STORE_DIR)]
        output: PathBuf,
    },

    /// Delete every saved specimen except `best`
    Clear {
        /// Directory of saved specimens
        #[arg(short, long, default_value = cartneat::neat::DEFAULT_STORE_DIR)]
        output: PathBuf,
    },
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let args = Args::parse();

    let quiet = matches!(args.command, Commands::Train { quiet: true, .. });
    init_tracing(quiet);

    let result = match args.command {
        Commands::Train {
            output,
            population_size,
            generations,
            seed,
            champions,
            antichampions,
            new_species,
            max_ticks,
            fresh,
            quiet,
        } => cli::train::execute(&cli::train::TrainOptions {
            output,
            population_size,
            generations,
            seed,
            champions,
            antichampions,
            new_species,
            max_ticks,
            fresh,
            quiet,
        }),

        Commands::Inspect { file, inputs } => cli::inspect::execute(&file, inputs.as_deref()),

        Commands::Dot { file, output } => cli::dot::execute(&file, output.as_deref()),

        Commands::SelectBest { output } => cli::store::select_best(&output),

        Commands::Clear { output } => cli::store::clear(&output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
