//! NEAT-style neuroevolution engine.
//!
//! Genomes are small directed graphs that may contain cycles. A population
//! of them is evolved with elitism, fitness-biased crossover and structural
//! mutation; innovation ids come from one [`Sequencer`] per run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │    Population (generation cycle)    │
//! ├─────────────────────────────────────┤
//! │  Crossover │ Mutation │ Fitness     │
//! ├─────────────────────────────────────┤
//! │     Network evaluation              │
//! ├─────────────────────────────────────┤
//! │  Genome │ Activation │ Sequencer    │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cartneat::host::CartPoleHabitat;
//! use cartneat::neat::{GenomeStore, Population, PopulationConfig};
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//!
//! let mut population = Population::new(
//!     PopulationConfig::default(),
//!     CartPoleHabitat::default(),
//!     SmallRng::seed_from_u64(42),
//!     Some(GenomeStore::default()),
//! );
//! while !population.is_finished() {
//!     let stats = population.run_generation()?;
//!     println!("generation {}: best {:.3}", stats.generation, stats.best);
//! }
//! # Ok::<(), cartneat::error::PopulationError>(())
//! ```

mod activation;
mod crossover;
mod dot;
mod fitness;
mod genome;
mod mutation;
mod network;
mod persistence;
mod population;
mod sequencer;

pub use activation::{Activation, UnknownActivation};
pub use crossover::{crossover, inherit};
pub use dot::{Dot, to_dot};
pub use fitness::{FitnessConfig, FitnessTracker};
pub use genome::{Connection, Genome, IoLayout, Node, NodeKind, UnknownNodeKind};
pub use mutation::{
    MutationConfig, NodeSplit, add_connection, add_node, mutate, perturb_weights,
    toggle_connections,
};
pub use network::{VISIT_BUDGET, evaluate_with_budget};
pub use persistence::{
    BEST, ConnectionRecord, DEFAULT_STORE_DIR, GenomeRecord, GenomeStore, HISTORY_FILE,
    NodeRecord, TrainingHistory, from_json, generation_best_name, generation_worst_name,
    load_genome, save_genome, snapshot_name, to_json,
};
pub use population::{
    GenerationStats, Origin, Phase, Population, PopulationConfig, Specimen, TickOutcome,
};
pub use sequencer::{ConnectionId, NodeId, Sequencer};
