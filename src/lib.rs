// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Cartneat: NEAT-style neuroevolution of cart-pole balancing controllers.
//!
//! The crate evolves small, possibly recurrent neural networks that map a
//! sensor vector to actuator values:
//! - Genomes keyed by innovation id, with cycle-tolerant evaluation
//! - Structural and parametric mutation, fitness-biased crossover
//! - Elitist generation management with JSON persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        CLI (train, inspect, ...)    │
//! ├─────────────────────────────────────┤
//! │   Population  ◄──►  Host boundary   │
//! ├─────────────────────────────────────┤
//! │   Genome engine + persistence       │
//! └─────────────────────────────────────┘
//! ```
//!
//! The simulation lives behind the [`host`] traits; [`host::cartpole`] is a
//! small reference implementation.

pub mod error;
pub mod host;
pub mod neat;

pub use error::{EvaluationError, FormatError, PersistenceError, PopulationError};

// Re-export key engine types at crate root for convenience
pub use neat::{
    Activation, Genome, GenomeStore, MutationConfig, Population, PopulationConfig, Sequencer,
};
