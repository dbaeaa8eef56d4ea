//! Boundary between the evolution engine and a simulation.
//!
//! The engine never touches physics directly. A [`Habitat`] spawns one
//! [`SimulationUnit`] per genome each generation; the population then drives
//! each unit once per tick: check [`SimulationUnit::death`], read
//! [`SimulationUnit::sense`], evaluate the network and hand the outputs to
//! [`SimulationUnit::actuate`]. The returned [`Telemetry`] feeds the
//! genome's fitness accumulators.

pub mod cartpole;

use rand::Rng;

pub use cartpole::{CartPole, CartPoleConfig, CartPoleHabitat};

/// Per-tick measurements reported by a unit after actuation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    /// Pole deviation from upright, in degrees.
    pub angle: f64,
    /// Signed distance from the start position.
    pub displacement: f64,
    /// Magnitude of the actuator command just applied.
    pub movement: f64,
}

/// One simulated body controlled by one genome.
pub trait SimulationUnit {
    /// Sensor vector, one value per network input.
    fn sense(&self) -> Vec<f64>;

    /// Apply network outputs and advance the simulation by one tick.
    fn actuate(&mut self, outputs: &[f64]) -> Telemetry;

    /// `Some(bonus)` once the unit has died; the bonus is added to fitness.
    fn death(&self) -> Option<f64>;
}

/// Factory for simulation units.
pub trait Habitat {
    /// The unit type this habitat spawns.
    type Unit: SimulationUnit;

    /// Called once before the units of a generation are spawned.
    fn begin_generation<R: Rng>(&mut self, _generation: u32, _rng: &mut R) {}

    /// Spawn a fresh unit for the genome in `slot`.
    fn spawn<R: Rng>(&mut self, slot: usize, rng: &mut R) -> Self::Unit;
}
