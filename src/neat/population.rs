//! Generation management.
//!
//! A [`Population`] owns every genome of the current generation, paired with
//! the simulation unit it controls. The host calls [`Population::tick`] once
//! per simulation step; once every specimen has died the generation is
//! ranked, persisted and replaced:
//!
//! - the top `champion_count` genomes and the bottom `antichampion_count`
//!   genomes are carried forward unchanged,
//! - `new_species_count` fresh minimal genomes are injected,
//! - every remaining slot gets a crossover child of two champions.
//!
//! All randomness comes from the injected RNG and all new ids from the
//! population's own [`Sequencer`].

// Fitness statistics average over counts
#![allow(clippy::cast_precision_loss)]

use crate::error::{PersistenceError, PopulationError};
use crate::host::{Habitat, SimulationUnit};
use crate::neat::crossover::crossover;
use crate::neat::fitness::{FitnessConfig, FitnessTracker};
use crate::neat::genome::{Genome, IoLayout};
use crate::neat::mutation::MutationConfig;
use crate::neat::persistence::{
    BEST, GenomeStore, TrainingHistory, generation_best_name, generation_worst_name,
    snapshot_name,
};
use crate::neat::sequencer::Sequencer;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Configuration for a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Genomes per generation.
    pub population_size: usize,
    /// Generations to run before finishing.
    pub max_generations: u32,
    /// Fittest genomes carried forward unchanged.
    pub champion_count: usize,
    /// Least fit genomes carried forward unchanged.
    pub antichampion_count: usize,
    /// Fresh minimal genomes injected per generation.
    pub new_species_count: usize,
    /// Network inputs (sensor vector length).
    pub input_count: usize,
    /// Network outputs (actuator vector length).
    pub output_count: usize,
    /// Mutation step probabilities.
    pub mutation: MutationConfig,
    /// Fitness formula weights.
    pub fitness: FitnessConfig,
    /// Seed slot 0 of the first generation from the store's best genome.
    pub seed_from_best: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 50,
            champion_count: 5,
            antichampion_count: 1,
            new_species_count: 0,
            input_count: 5,
            output_count: 1,
            mutation: MutationConfig::default(),
            fitness: FitnessConfig::default(),
            seed_from_best: true,
        }
    }
}

impl PopulationConfig {
    /// Apply string overrides from the host process.
    ///
    /// Recognized keys are `populationSize`/`population-size` and
    /// `generations`/`max-generations`. Values must be positive integers;
    /// anything else is logged and ignored.
    pub fn apply_overrides<'a>(&mut self, overrides: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (key, value) in overrides {
            match key {
                "populationSize" | "population-size" => match parse_positive(value) {
                    Some(n) => self.population_size = n,
                    None => warn!(key, value, "ignoring invalid override"),
                },
                "generations" | "max-generations" => match parse_positive(value) {
                    Some(n) => self.max_generations = n,
                    None => warn!(key, value, "ignoring invalid override"),
                },
                _ => warn!(key, value, "ignoring unknown override"),
            }
        }
    }
}

fn parse_positive<T: FromStr + PartialOrd + Default>(value: &str) -> Option<T> {
    value.trim().parse::<T>().ok().filter(|n| *n > T::default())
}

/// Where the population manager is in the generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Genomes are ready; units have not been spawned yet.
    Populating,
    /// Specimens are being simulated.
    Evaluating,
    /// Every specimen died; the next generation is prepared.
    GenerationComplete,
    /// The generation budget is exhausted.
    Finished,
}

/// How a specimen's genome came to be in its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Loaded from the store's best genome.
    Seed,
    /// Minimal genome of the first generation.
    Initial,
    /// Carried forward as one of the fittest.
    Champion,
    /// Carried forward as one of the least fit.
    Antichampion,
    /// Minimal genome injected after the first generation.
    Fresh,
    /// Crossover child of two champions.
    Offspring,
}

impl Origin {
    /// Lowercase label for logs and summaries.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Initial => "initial",
            Self::Champion => "champion",
            Self::Antichampion => "antichampion",
            Self::Fresh => "fresh",
            Self::Offspring => "offspring",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A genome paired with the unit it controls.
#[derive(Debug, Clone)]
pub struct Specimen<U> {
    genome: Genome,
    unit: U,
    tracker: FitnessTracker,
    origin: Origin,
}

impl<U> Specimen<U> {
    /// The specimen's network.
    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    /// The simulated body.
    #[must_use]
    pub fn unit(&self) -> &U {
        &self.unit
    }

    /// Fitness counters accumulated so far.
    #[must_use]
    pub fn tracker(&self) -> &FitnessTracker {
        &self.tracker
    }

    /// Where the genome came from.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the specimen is still being simulated.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.genome.is_alive()
    }
}

/// Fitness summary of one finished generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number, from 0.
    pub generation: u32,
    /// Highest fitness.
    pub best: f64,
    /// Lowest fitness.
    pub worst: f64,
    /// Mean fitness.
    pub mean: f64,
    /// Population standard deviation of fitness.
    pub std: f64,
}

impl GenerationStats {
    /// Summarize a generation's fitness values. All zero when empty.
    #[must_use]
    pub fn from_fitness(generation: u32, fitness: &[f64]) -> Self {
        if fitness.is_empty() {
            return Self {
                generation,
                best: 0.0,
                worst: 0.0,
                mean: 0.0,
                std: 0.0,
            };
        }

        let n = fitness.len() as f64;
        let mean = fitness.iter().sum::<f64>() / n;
        let best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let worst = fitness.iter().copied().fold(f64::INFINITY, f64::min);
        let variance = fitness.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n;

        Self {
            generation,
            best,
            worst,
            mean,
            std: variance.sqrt(),
        }
    }
}

/// Result of one [`Population::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Specimens are still alive.
    Running {
        /// Living specimens after this tick.
        alive: usize,
    },
    /// The last specimen died; the next generation is ready.
    GenerationComplete(GenerationStats),
    /// The last generation finished.
    Finished(GenerationStats),
}

/// The population manager.
pub struct Population<H: Habitat, R: Rng> {
    config: PopulationConfig,
    habitat: H,
    rng: R,
    sequencer: Sequencer,
    layout: IoLayout,
    store: Option<GenomeStore>,
    phase: Phase,
    generation: u32,
    specimens: Vec<Specimen<H::Unit>>,
    pending: Vec<(Genome, Origin)>,
    best_ever: Option<Genome>,
    flushed: bool,
    stats: Vec<GenerationStats>,
    history: TrainingHistory,
}

impl<H: Habitat, R: Rng> Population<H, R> {
    /// Prepare the first generation.
    ///
    /// With `seed_from_best` and a store, slot 0 is the store's `best`
    /// genome. A missing file is silently skipped; an unreadable one, or one
    /// with the wrong I/O arity, is logged and replaced by a random genome.
    pub fn new(
        config: PopulationConfig,
        habitat: H,
        mut rng: R,
        store: Option<GenomeStore>,
    ) -> Self {
        let mut sequencer = Sequencer::new();

        let seed = match &store {
            Some(store) if config.seed_from_best => load_seed(store, &config, &mut sequencer),
            _ => None,
        };
        let layout = match &seed {
            Some(genome) => IoLayout::from_genome(genome, &mut sequencer),
            None => IoLayout::allocate(config.input_count, config.output_count, &mut sequencer),
        };

        let mut pending = Vec::with_capacity(config.population_size);
        if let Some(mut genome) = seed {
            genome.reset();
            pending.push((genome, Origin::Seed));
        }
        while pending.len() < config.population_size {
            pending.push((Genome::minimal(&layout, &mut rng), Origin::Initial));
        }
        pending.truncate(config.population_size);

        Self {
            config,
            habitat,
            rng,
            sequencer,
            layout,
            store,
            phase: Phase::Populating,
            generation: 0,
            specimens: Vec::new(),
            pending,
            best_ever: None,
            flushed: false,
            stats: Vec::new(),
            history: TrainingHistory::default(),
        }
    }

    /// Advance the simulation by one step.
    ///
    /// Spawns the generation's units first if needed. Each living specimen
    /// is checked for death, otherwise sensed, evaluated and actuated.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::Finished`] after the last generation and
    /// [`PopulationError::Evaluation`] if a unit's sensor vector does not
    /// fit its genome.
    pub fn tick(&mut self) -> Result<TickOutcome, PopulationError> {
        match self.phase {
            Phase::Finished => return Err(PopulationError::Finished),
            Phase::Populating | Phase::GenerationComplete => self.populate()?,
            Phase::Evaluating => {}
        }

        for slot in 0..self.specimens.len() {
            let specimen = &self.specimens[slot];
            if !specimen.is_alive() {
                continue;
            }
            if let Some(bonus) = specimen.unit.death() {
                self.mark_dead(slot, bonus)?;
                continue;
            }

            let inputs = specimen.unit.sense();
            let outputs = self.evaluate(slot, &inputs)?;
            let specimen = &mut self.specimens[slot];
            let telemetry = specimen.unit.actuate(&outputs);
            specimen.tracker.record_angle(telemetry.angle);
            specimen.tracker.record_displacement(telemetry.displacement);
            specimen.tracker.record_movement(telemetry.movement);
        }

        if let Some(stats) = self.try_complete_generation() {
            return Ok(if self.phase == Phase::Finished {
                TickOutcome::Finished(stats)
            } else {
                TickOutcome::GenerationComplete(stats)
            });
        }
        Ok(TickOutcome::Running {
            alive: self.alive_count(),
        })
    }

    /// Tick until the current generation completes.
    ///
    /// # Errors
    ///
    /// See [`Population::tick`].
    pub fn run_generation(&mut self) -> Result<GenerationStats, PopulationError> {
        loop {
            match self.tick()? {
                TickOutcome::Running { .. } => {}
                TickOutcome::GenerationComplete(stats) | TickOutcome::Finished(stats) => {
                    return Ok(stats);
                }
            }
        }
    }

    /// Spawn one unit per prepared genome and start evaluating.
    ///
    /// Does nothing while a generation is being evaluated.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::Finished`] after the last generation.
    pub fn populate(&mut self) -> Result<(), PopulationError> {
        match self.phase {
            Phase::Finished => return Err(PopulationError::Finished),
            Phase::Evaluating => return Ok(()),
            Phase::Populating | Phase::GenerationComplete => {}
        }

        self.habitat.begin_generation(self.generation, &mut self.rng);
        let pending = std::mem::take(&mut self.pending);
        self.specimens = pending
            .into_iter()
            .enumerate()
            .map(|(slot, (genome, origin))| Specimen {
                genome,
                unit: self.habitat.spawn(slot, &mut self.rng),
                tracker: FitnessTracker::default(),
                origin,
            })
            .collect();
        self.phase = Phase::Evaluating;
        debug!(
            generation = self.generation,
            specimens = self.specimens.len(),
            "generation populated"
        );
        Ok(())
    }

    /// Evaluate the network in `slot` and count one tick for it.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownSlot`] for a slot outside the
    /// generation, [`PopulationError::Dead`] once the specimen has died and
    /// [`PopulationError::Evaluation`] on an input length mismatch.
    pub fn evaluate(&mut self, slot: usize, inputs: &[f64]) -> Result<Vec<f64>, PopulationError> {
        let specimen = self.specimen_mut(slot)?;
        if !specimen.is_alive() {
            return Err(PopulationError::Dead(slot));
        }
        let outputs = specimen
            .genome
            .evaluate(inputs)
            .map_err(|source| PopulationError::Evaluation { slot, source })?;
        specimen.tracker.tick();
        Ok(outputs)
    }

    /// Record the pole angle (degrees) for `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownSlot`] for a slot outside the generation.
    pub fn record_angle(&mut self, slot: usize, degrees: f64) -> Result<(), PopulationError> {
        self.specimen_mut(slot)?.tracker.record_angle(degrees);
        Ok(())
    }

    /// Record the displacement from the start position for `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownSlot`] for a slot outside the generation.
    pub fn record_displacement(
        &mut self,
        slot: usize,
        displacement: f64,
    ) -> Result<(), PopulationError> {
        self.specimen_mut(slot)?
            .tracker
            .record_displacement(displacement);
        Ok(())
    }

    /// Record an actuator command magnitude for `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownSlot`] for a slot outside the generation.
    pub fn record_movement(&mut self, slot: usize, amount: f64) -> Result<(), PopulationError> {
        self.specimen_mut(slot)?.tracker.record_movement(amount);
        Ok(())
    }

    /// Finalize the fitness of `slot`. Already dead specimens are left as is.
    ///
    /// A specimen fitter than every genome seen so far becomes the new
    /// best-ever genome right away, so an interrupted generation still
    /// flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError::UnknownSlot`] for a slot outside the generation.
    pub fn mark_dead(&mut self, slot: usize, bonus: f64) -> Result<(), PopulationError> {
        let fitness_config = self.config.fitness;
        let specimen = self.specimen_mut(slot)?;
        if !specimen.is_alive() {
            return Ok(());
        }
        let fitness = specimen.tracker.score(&fitness_config, bonus);
        specimen.genome.kill(fitness);
        debug!(
            slot,
            fitness,
            ticks = specimen.tracker.ticks(),
            origin = %specimen.origin,
            "specimen died"
        );

        if self
            .best_ever
            .as_ref()
            .is_none_or(|best| fitness > best.fitness())
        {
            self.best_ever = Some(self.specimens[slot].genome.clone());
            self.flushed = false;
        }
        Ok(())
    }

    /// Complete the generation if every specimen is dead.
    ///
    /// Hosts that drive specimens through the per-slot methods call this
    /// after their last [`Population::mark_dead`].
    pub fn try_complete_generation(&mut self) -> Option<GenerationStats> {
        if self.phase != Phase::Evaluating || self.alive_count() > 0 {
            return None;
        }
        Some(self.complete_generation())
    }

    fn complete_generation(&mut self) -> GenerationStats {
        let generation = self.generation;
        let mut ranked = std::mem::take(&mut self.specimens);
        ranked.sort_by(|a, b| b.genome.fitness().total_cmp(&a.genome.fitness()));

        let fitness: Vec<f64> = ranked.iter().map(|s| s.genome.fitness()).collect();
        let stats = GenerationStats::from_fitness(generation, &fitness);
        self.stats.push(stats);
        self.history.push(stats.best, stats.mean, stats.worst);

        if let (Some(best), Some(worst)) = (ranked.first(), ranked.last()) {
            self.persist_generation(generation, &best.genome, &worst.genome);
            if self
                .best_ever
                .as_ref()
                .is_none_or(|b| best.genome.fitness() > b.fitness())
            {
                self.best_ever = Some(best.genome.clone());
                self.flushed = false;
            }
        }

        info!(
            generation,
            best = stats.best,
            mean = stats.mean,
            worst = stats.worst,
            std = stats.std,
            "generation complete"
        );

        self.generation += 1;
        if self.generation >= self.config.max_generations {
            self.phase = Phase::Finished;
            if let Err(e) = self.flush() {
                warn!(error = %e, "failed to flush best genome");
            }
            return stats;
        }

        self.pending = self.next_generation(ranked);
        self.phase = Phase::GenerationComplete;
        stats
    }

    /// Build the next generation's genomes from a generation ranked best first.
    fn next_generation(&mut self, ranked: Vec<Specimen<H::Unit>>) -> Vec<(Genome, Origin)> {
        let size = self.config.population_size;
        let champions = self.config.champion_count.min(ranked.len()).min(size);
        let antichampions = self
            .config
            .antichampion_count
            .min(ranked.len() - champions)
            .min(size - champions);
        let fresh = self
            .config
            .new_species_count
            .min(size - champions - antichampions);
        let offspring = size - champions - antichampions - fresh;

        let mut genomes: Vec<Genome> = ranked.into_iter().map(|s| s.genome).collect();

        // Children are bred before the elites are reset: crossover needs fitness.
        let mut children = Vec::with_capacity(offspring);
        if champions > 0 {
            for j in 0..offspring {
                let child = crossover(
                    &genomes[j % champions],
                    &genomes[(j + 1) % champions],
                    &self.config.mutation,
                    &mut self.sequencer,
                    &mut self.rng,
                );
                children.push((child, Origin::Offspring));
            }
        }

        let tail = genomes.split_off(genomes.len() - antichampions);
        genomes.truncate(champions);

        let mut next = Vec::with_capacity(size);
        for (mut genome, origin) in genomes
            .into_iter()
            .map(|g| (g, Origin::Champion))
            .chain(tail.into_iter().map(|g| (g, Origin::Antichampion)))
        {
            genome.reset();
            next.push((genome, origin));
        }
        for _ in 0..fresh {
            next.push((Genome::minimal(&self.layout, &mut self.rng), Origin::Fresh));
        }
        next.extend(children);

        // With no champions to breed from, the gap is filled with fresh genomes.
        while next.len() < size {
            next.push((Genome::minimal(&self.layout, &mut self.rng), Origin::Fresh));
        }
        next
    }

    fn persist_generation(&self, generation: u32, best: &Genome, worst: &Genome) {
        let Some(store) = &self.store else {
            return;
        };
        let saves = [
            (generation_best_name(generation), best),
            (generation_worst_name(generation), worst),
        ];
        for (name, genome) in saves {
            if let Err(e) = store.save(&name, genome) {
                warn!(error = %e, "failed to save generation snapshot");
            }
        }
        if let Err(e) = store.save_history(&self.history) {
            warn!(error = %e, "failed to save training history");
        }
    }

    /// Persist the best-ever genome.
    ///
    /// Writes a timestamped `best_<YYYYMMDD_HHMMSS>` snapshot and replaces
    /// `best` unless the stored copy is at least as fit. Returns whether a
    /// snapshot was written; repeated calls for the same best-ever genome
    /// write nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the snapshot fails.
    pub fn flush(&mut self) -> Result<bool, PersistenceError> {
        if self.flushed {
            return Ok(false);
        }
        let (Some(store), Some(best)) = (&self.store, &self.best_ever) else {
            return Ok(false);
        };

        let path = store.save(&snapshot_name(), best)?;
        let promoted = store.save_if_fitter(BEST, best)?;
        self.flushed = true;
        info!(
            path = %path.display(),
            fitness = best.fitness(),
            promoted,
            "flushed best genome"
        );
        Ok(true)
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Generation being prepared or evaluated, from 0.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether the generation budget is exhausted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Specimens of the generation being evaluated, in slot order.
    #[must_use]
    pub fn specimens(&self) -> &[Specimen<H::Unit>] {
        &self.specimens
    }

    /// Genomes of the current generation, in slot order.
    ///
    /// Before units are spawned these are the prepared genomes.
    pub fn genomes(&self) -> Box<dyn Iterator<Item = &Genome> + '_> {
        if self.phase == Phase::Evaluating {
            Box::new(self.specimens.iter().map(|s| &s.genome))
        } else {
            Box::new(self.pending.iter().map(|(g, _)| g))
        }
    }

    /// Origins of the current generation, in slot order.
    #[must_use]
    pub fn origins(&self) -> Vec<Origin> {
        if self.phase == Phase::Evaluating {
            self.specimens.iter().map(|s| s.origin).collect()
        } else {
            self.pending.iter().map(|&(_, o)| o).collect()
        }
    }

    /// Living specimens.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.specimens.iter().filter(|s| s.is_alive()).count()
    }

    /// Fittest genome seen in any finished generation.
    #[must_use]
    pub fn best_ever(&self) -> Option<&Genome> {
        self.best_ever.as_ref()
    }

    /// Statistics of every finished generation.
    #[must_use]
    pub fn stats(&self) -> &[GenerationStats] {
        &self.stats
    }

    /// Best, mean and worst fitness per finished generation.
    #[must_use]
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// The run's id sequencer.
    #[must_use]
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Shared ids of the run's minimal genomes.
    #[must_use]
    pub fn layout(&self) -> &IoLayout {
        &self.layout
    }

    /// The run's configuration.
    #[must_use]
    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// The host factory.
    #[must_use]
    pub fn habitat(&self) -> &H {
        &self.habitat
    }

    fn specimen_mut(&mut self, slot: usize) -> Result<&mut Specimen<H::Unit>, PopulationError> {
        self.specimens
            .get_mut(slot)
            .ok_or(PopulationError::UnknownSlot(slot))
    }
}

impl<H: Habitat, R: Rng> Drop for Population<H, R> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush best genome on shutdown");
        }
    }
}

impl<H: Habitat, R: Rng> fmt::Debug for Population<H, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("specimens", &self.specimens.len())
            .field("alive", &self.alive_count())
            .field("best_ever", &self.best_ever.as_ref().map(Genome::fitness))
            .finish_non_exhaustive()
    }
}

fn load_seed(
    store: &GenomeStore,
    config: &PopulationConfig,
    seq: &mut Sequencer,
) -> Option<Genome> {
    match store.load(BEST, seq) {
        Ok(Some(genome))
            if genome.inputs().len() == config.input_count
                && genome.outputs().len() == config.output_count =>
        {
            info!(fitness = genome.fitness(), "seeding from stored best genome");
            Some(genome)
        }
        Ok(Some(genome)) => {
            warn!(
                inputs = genome.inputs().len(),
                outputs = genome.outputs().len(),
                "stored best genome has the wrong arity, starting fresh"
            );
            None
        }
        Ok(None) => None,
        Err(e) => {
            warn!(error = %e, "failed to load stored best genome, starting fresh");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Telemetry;
    use crate::neat::genome::{Connection, Node, NodeKind};
    use crate::neat::sequencer::ConnectionId;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    /// A unit that lives `lifetime` ticks and always reports full movement.
    #[derive(Debug, Clone)]
    struct Timer {
        lifetime: u64,
        ticks: u64,
        inputs: usize,
    }

    impl SimulationUnit for Timer {
        fn sense(&self) -> Vec<f64> {
            vec![0.0; self.inputs]
        }

        fn actuate(&mut self, _outputs: &[f64]) -> Telemetry {
            self.ticks += 1;
            Telemetry {
                angle: 0.0,
                displacement: 0.0,
                movement: 1.0,
            }
        }

        fn death(&self) -> Option<f64> {
            (self.ticks >= self.lifetime).then_some(0.0)
        }
    }

    /// Units live longer the higher their slot.
    #[derive(Debug, Clone, Default)]
    struct Stopwatch {
        inputs: usize,
        generations_started: u32,
    }

    impl Habitat for Stopwatch {
        type Unit = Timer;

        fn begin_generation<R: Rng>(&mut self, _generation: u32, _rng: &mut R) {
            self.generations_started += 1;
        }

        fn spawn<R: Rng>(&mut self, slot: usize, _rng: &mut R) -> Timer {
            Timer {
                lifetime: 10 + slot as u64,
                ticks: 0,
                inputs: self.inputs,
            }
        }
    }

    fn config(size: usize, generations: u32) -> PopulationConfig {
        PopulationConfig {
            population_size: size,
            max_generations: generations,
            ..PopulationConfig::default()
        }
    }

    fn population(
        config: PopulationConfig,
        store: Option<GenomeStore>,
    ) -> Population<Stopwatch, SmallRng> {
        let habitat = Stopwatch {
            inputs: config.input_count,
            generations_started: 0,
        };
        Population::new(config, habitat, SmallRng::seed_from_u64(42), store)
    }

    fn connection_ids(genome: &Genome) -> BTreeSet<ConnectionId> {
        genome.connections().map(|c| c.id).collect()
    }

    #[test]
    fn test_first_generation_shape() {
        let pop = population(config(50, 3), None);

        assert_eq!(pop.phase(), Phase::Populating);
        assert_eq!(pop.genomes().count(), 50);
        assert!(pop.origins().iter().all(|&o| o == Origin::Initial));
        for genome in pop.genomes() {
            assert_eq!(genome.inputs(), pop.layout().inputs());
            assert_eq!(genome.connection_count(), 5);
        }
    }

    #[test]
    fn test_generation_turnover_composition() {
        let mut cfg = config(50, 5);
        cfg.new_species_count = 5;
        let mut pop = population(cfg, None);
        let before: Vec<Genome> = pop.genomes().cloned().collect();
        let floor = pop.sequencer().peek_connection_id();

        let stats = pop.run_generation().unwrap();
        assert_eq!(stats.generation, 0);
        assert_eq!(pop.phase(), Phase::GenerationComplete);
        assert_eq!(pop.generation(), 1);

        let origins = pop.origins();
        let count = |o: Origin| origins.iter().filter(|&&x| x == o).count();
        assert_eq!(count(Origin::Champion), 5);
        assert_eq!(count(Origin::Antichampion), 1);
        assert_eq!(count(Origin::Fresh), 5);
        assert_eq!(count(Origin::Offspring), 39);
        assert_eq!(&origins[..6], &[
            Origin::Champion,
            Origin::Champion,
            Origin::Champion,
            Origin::Champion,
            Origin::Champion,
            Origin::Antichampion,
        ]);

        for genome in pop.genomes() {
            assert!(genome.is_alive());
            assert!(genome.fitness().abs() < f64::EPSILON);
            assert_eq!(genome.inputs().len(), 5);
            assert_eq!(genome.outputs().len(), 1);
        }

        // Lifetime grows with slot: slots 49..=45 are the champions, slot 0
        // the antichampion. Both are carried over gene for gene.
        let next: Vec<&Genome> = pop.genomes().collect();
        let carried = [49, 48, 47, 46, 45, 0];
        for (i, &slot) in carried.iter().enumerate() {
            assert_eq!(connection_ids(next[i]), connection_ids(&before[slot]));
            for c in before[slot].connections() {
                assert_eq!(next[i].connection(c.id), Some(c));
            }
        }

        let inherited: BTreeSet<ConnectionId> = before.iter().flat_map(connection_ids).collect();
        for (genome, origin) in pop.genomes().zip(&origins) {
            if *origin != Origin::Offspring {
                continue;
            }
            for c in genome.connections() {
                assert!(
                    inherited.contains(&c.id) || c.id >= floor,
                    "offspring gene {} is neither inherited nor fresh",
                    c.id
                );
            }
        }
    }

    #[test]
    fn test_champions_are_carried_unchanged() {
        let mut pop = population(config(10, 5), None);
        pop.populate().unwrap();
        let before: Vec<Genome> = pop.specimens().iter().map(|s| s.genome.clone()).collect();

        pop.run_generation().unwrap();

        // Lifetime grows with slot, so slot 9 is the fittest and slot 0 the least.
        let next: Vec<Genome> = pop.genomes().cloned().collect();
        for (i, slot) in (5..10).rev().enumerate() {
            assert_eq!(connection_ids(&next[i]), connection_ids(&before[slot]));
            for c in before[slot].connections() {
                assert_eq!(next[i].connection(c.id), Some(c));
            }
        }
        assert_eq!(connection_ids(&next[5]), connection_ids(&before[0]));
    }

    #[test]
    fn test_fitness_ranks_by_lifetime() {
        let mut pop = population(config(4, 2), None);
        let stats = pop.run_generation().unwrap();

        // Lifetimes 10..=13 with full movement: fitness = ticks * 0.01.
        assert!((stats.best - 0.13).abs() < 1e-9);
        assert!((stats.worst - 0.10).abs() < 1e-9);
        assert!((stats.mean - 0.115).abs() < 1e-9);
        assert!((pop.best_ever().unwrap().fitness() - 0.13).abs() < 1e-9);
    }

    #[test]
    fn test_runs_to_finished() {
        let mut pop = population(config(8, 3), None);
        for expected in 0..3 {
            let stats = pop.run_generation().unwrap();
            assert_eq!(stats.generation, expected);
        }

        assert!(pop.is_finished());
        assert_eq!(pop.stats().len(), 3);
        assert_eq!(pop.history().len(), 3);
        assert!(matches!(pop.tick(), Err(PopulationError::Finished)));
        assert_eq!(pop.habitat().generations_started, 3);
    }

    #[test]
    fn test_ids_stay_unique_across_generations() {
        let mut cfg = config(20, 4);
        cfg.mutation.add_node_rate = 1.0;
        cfg.mutation.add_connection_rate = 1.0;
        let mut pop = population(cfg, None);

        for _ in 0..3 {
            pop.run_generation().unwrap();
        }

        let floor = pop.sequencer().peek_connection_id();
        for genome in pop.genomes() {
            assert!(genome.max_connection_id().is_none_or(|id| id < floor));
            assert!(genome.max_node_id().is_none_or(|id| id < pop.sequencer().peek_node_id()));
        }
    }

    #[test]
    fn test_low_level_host_api() {
        let mut pop = population(config(2, 1), None);
        pop.populate().unwrap();

        let outputs = pop.evaluate(0, &[0.0; 5]).unwrap();
        assert_eq!(outputs.len(), 1);
        pop.record_angle(0, 0.0).unwrap();
        pop.record_movement(0, 2.0).unwrap();
        pop.record_displacement(0, 1.0).unwrap();

        assert!(matches!(
            pop.evaluate(0, &[0.0; 3]),
            Err(PopulationError::Evaluation { slot: 0, .. })
        ));
        assert!(matches!(pop.record_angle(7, 0.0), Err(PopulationError::UnknownSlot(7))));

        pop.mark_dead(0, 1.0).unwrap();
        let fitness = pop.specimens()[0].genome().fitness();
        // One tick: 0.01 survival - 0.05 drift + 1.0 bonus.
        assert!((fitness - 0.96).abs() < 1e-9);
        pop.mark_dead(0, 100.0).unwrap();
        assert!((pop.specimens()[0].genome().fitness() - fitness).abs() < f64::EPSILON);

        // Dead specimens take no further ticks.
        assert!(matches!(pop.evaluate(0, &[0.0; 5]), Err(PopulationError::Dead(0))));
        assert_eq!(pop.specimens()[0].tracker().ticks(), 1);

        assert!(pop.try_complete_generation().is_none());
        pop.mark_dead(1, 0.0).unwrap();
        assert!(pop.try_complete_generation().is_some());
        assert!(pop.is_finished());
    }

    #[test]
    fn test_overrides() {
        let mut cfg = PopulationConfig::default();
        cfg.apply_overrides([("populationSize", "10"), ("generations", "3")]);
        assert_eq!(cfg.population_size, 10);
        assert_eq!(cfg.max_generations, 3);

        cfg.apply_overrides([
            ("population-size", "abc"),
            ("max-generations", "-4"),
            ("generations", "0"),
            ("speed", "9"),
        ]);
        assert_eq!(cfg.population_size, 10);
        assert_eq!(cfg.max_generations, 3);
    }

    #[test]
    fn test_generation_stats() {
        let stats = GenerationStats::from_fitness(2, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert!((stats.best - 5.0).abs() < 1e-12);
        assert!((stats.worst - 1.0).abs() < 1e-12);
        assert!((stats.std - 2.0_f64.sqrt()).abs() < 1e-12);

        let empty = GenerationStats::from_fitness(0, &[]);
        assert!(empty.best.abs() < f64::EPSILON);
    }

    #[test]
    fn test_store_receives_snapshots_and_flush() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());
        {
            let mut pop = population(config(6, 2), Some(store.clone()));
            pop.run_generation().unwrap();
            pop.run_generation().unwrap();
            assert!(pop.is_finished());
        }

        let names = store.names().unwrap();
        for name in ["generation_0_best", "generation_0_worst", "generation_1_best", BEST] {
            assert!(names.iter().any(|n| n == name), "missing {name}");
        }
        assert!(names.iter().any(|n| n.starts_with("best_")));
        let history = store.load_history().unwrap().unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_drop_flushes_interrupted_run() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());
        {
            let mut pop = population(config(6, 50), Some(store.clone()));
            pop.run_generation().unwrap();
            assert!(!pop.is_finished());
        }
        assert!(store.fitness_of(BEST).unwrap().is_some());
    }

    #[test]
    fn test_flush_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());
        let mut pop = population(config(4, 50), Some(store));
        assert!(!pop.flush().unwrap(), "nothing to flush before any specimen dies");

        pop.run_generation().unwrap();
        assert!(pop.flush().unwrap());
        assert!(!pop.flush().unwrap());
    }

    #[test]
    fn test_seeds_slot_zero_from_best() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());

        // A hand-built 5-1 genome with one hidden node and high ids.
        let mut nodes: Vec<Node> = (0..5).map(|id| Node::new(id, NodeKind::Input)).collect();
        nodes.push(Node::new(5, NodeKind::Output));
        nodes.push(Node::new(40, NodeKind::Hidden));
        let connections = vec![
            Connection::new(3, 0, 40, 0.5),
            Connection::new(90, 40, 5, -0.5),
            Connection::new(91, 1, 5, 1.0),
        ];
        let mut seed = Genome::from_parts(nodes, connections, (0..5).collect(), vec![5], 3.0);
        seed.set_fitness(3.0);
        store.save(BEST, &seed).unwrap();

        let pop = population(config(10, 5), Some(store));

        let origins = pop.origins();
        assert_eq!(origins[0], Origin::Seed);
        assert!(origins[1..].iter().all(|&o| o == Origin::Initial));

        let first = pop.genomes().next().unwrap();
        assert_eq!(connection_ids(first), connection_ids(&seed));
        assert!(first.fitness().abs() < f64::EPSILON);

        // Fresh genomes reuse the seed's I/O and its input->output ids.
        assert_eq!(pop.layout().inputs(), seed.inputs());
        let fresh = pop.genomes().nth(1).unwrap();
        assert!(fresh.connection(91).is_some_and(|c| (c.from, c.to) == (1, 5)));
        assert!(fresh.connections().all(|c| c.id == 91 || c.id > 91));
        assert!(pop.sequencer().peek_node_id() > 40);
    }

    #[test]
    fn test_malformed_seed_falls_back() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());
        std::fs::write(store.path(BEST), "{ broken").unwrap();

        let pop = population(config(5, 5), Some(store));

        assert!(pop.origins().iter().all(|&o| o == Origin::Initial));
        assert_eq!(pop.genomes().count(), 5);
    }

    #[test]
    fn test_wrong_arity_seed_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());
        let mut seq = Sequencer::new();
        let layout = IoLayout::allocate(2, 1, &mut seq);
        let small = Genome::minimal(&layout, &mut SmallRng::seed_from_u64(1));
        store.save(BEST, &small).unwrap();

        let pop = population(config(5, 5), Some(store));

        assert!(pop.origins().iter().all(|&o| o == Origin::Initial));
        assert_eq!(pop.layout().inputs().len(), 5);
    }

    #[test]
    fn test_small_population_keeps_elites_disjoint() {
        let mut cfg = config(3, 5);
        cfg.champion_count = 5;
        let mut pop = population(cfg, None);

        pop.run_generation().unwrap();

        assert_eq!(pop.origins(), vec![Origin::Champion; 3]);
    }

    #[test]
    fn test_first_death_becomes_best_ever() {
        let mut pop = population(config(4, 5), None);
        while pop.alive_count() != 3 {
            pop.tick().unwrap();
        }

        assert_eq!(pop.phase(), Phase::Evaluating);
        assert!(pop.stats().is_empty());
        // Slot 0 lives 10 ticks with full movement.
        assert!((pop.best_ever().unwrap().fitness() - 0.10).abs() < 1e-9);

        pop.tick().unwrap();
        assert!((pop.best_ever().unwrap().fitness() - 0.11).abs() < 1e-9);
    }

    #[test]
    fn test_drop_mid_generation_persists_the_dead() {
        let dir = TempDir::new().unwrap();
        let store = GenomeStore::new(dir.path());
        {
            let mut pop = population(config(10, 5), Some(store.clone()));
            while pop.alive_count() == 10 || pop.phase() != Phase::Evaluating {
                pop.tick().unwrap();
            }
            assert_eq!(pop.alive_count(), 9);
        }

        let stored = store.fitness_of(BEST).unwrap();
        assert!(stored.is_some_and(|f| (f - 0.10).abs() < 1e-9));
        assert!(store.names().unwrap().iter().any(|n| n.starts_with("best_")));
    }
}
