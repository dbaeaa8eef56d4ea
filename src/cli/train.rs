//! Train command implementation.

use super::CliError;
use cartneat::host::{CartPoleConfig, CartPoleHabitat};
use cartneat::neat::{GenomeStore, Population, PopulationConfig, TickOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Options of the train command.
#[derive(Debug)]
pub(crate) struct TrainOptions {
    pub(crate) output: PathBuf,
    pub(crate) population_size: Option<String>,
    pub(crate) generations: Option<String>,
    pub(crate) seed: Option<u64>,
    pub(crate) champions: usize,
    pub(crate) antichampions: usize,
    pub(crate) new_species: usize,
    pub(crate) max_ticks: u64,
    pub(crate) fresh: bool,
    pub(crate) quiet: bool,
}

/// Execute the train command.
///
/// # Errors
///
/// Returns an error if a network rejects its sensor vector.
pub(crate) fn execute(opts: &TrainOptions) -> Result<(), CliError> {
    let mut config = PopulationConfig {
        champion_count: opts.champions,
        antichampion_count: opts.antichampions,
        new_species_count: opts.new_species,
        seed_from_best: !opts.fresh,
        ..PopulationConfig::default()
    };
    let overrides = [
        ("populationSize", opts.population_size.as_deref()),
        ("generations", opts.generations.as_deref()),
    ];
    config.apply_overrides(overrides.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));

    let seed = opts.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(42)
    });

    // Setup graceful shutdown
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl+C handler");
    }

    info!(
        seed,
        population = config.population_size,
        generations = config.max_generations,
        output = %opts.output.display(),
        "starting training"
    );

    let generations = config.max_generations;
    let habitat = CartPoleHabitat::new(CartPoleConfig {
        max_ticks: opts.max_ticks,
        ..CartPoleConfig::default()
    });
    let store = GenomeStore::new(&opts.output);
    let mut population =
        Population::new(config, habitat, SmallRng::seed_from_u64(seed), Some(store));

    let pb = if opts.quiet {
        None
    } else {
        let pb = ProgressBar::new(u64::from(generations));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} generations {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    };

    let start = Instant::now();
    let mut interrupted = false;
    while !population.is_finished() {
        if shutdown.load(Ordering::SeqCst) {
            warn!(generation = population.generation(), "interrupted, saving best genome");
            interrupted = true;
            break;
        }
        match population.tick()? {
            TickOutcome::Running { .. } => {}
            TickOutcome::GenerationComplete(stats) | TickOutcome::Finished(stats) => {
                if let Some(pb) = &pb {
                    pb.inc(1);
                    pb.set_message(format!("best={:.3} mean={:.3}", stats.best, stats.mean));
                }
            }
        }
    }

    if let Some(pb) = pb {
        if interrupted {
            pb.abandon_with_message("interrupted");
        } else {
            pb.finish_with_message("done");
        }
    }

    population.flush()?;

    println!();
    println!("Training {}!", if interrupted { "interrupted" } else { "complete" });
    println!("  Generations: {}", population.stats().len());
    if let Some(best) = population.best_ever() {
        println!("  Best fitness: {:.4}", best.fitness());
        println!(
            "  Best genome: {} nodes, {} connections ({} enabled)",
            best.node_count(),
            best.connection_count(),
            best.enabled_connection_count()
        );
    }
    println!("  Elapsed time: {:.1}s", start.elapsed().as_secs_f64());
    println!("  Output: {}", opts.output.display());

    Ok(())
}
