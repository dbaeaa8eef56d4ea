#![no_main]

//! Grown-network fuzzer.
//!
//! Grows a genome through a fuzzer-chosen sequence of mutations and
//! crossovers, then evaluates it repeatedly. Evaluation must terminate on
//! any topology, cycles included, and keep sigmoid outputs in range.

use arbitrary::Arbitrary;
use cartneat::neat::{
    Genome, IoLayout, MutationConfig, Sequencer, add_connection, add_node, crossover, mutate,
    perturb_weights,
};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// One growth step.
#[derive(Arbitrary, Debug, Clone, Copy)]
enum Step {
    /// Split a random connection.
    AddNode,
    /// Connect two random nodes.
    AddConnection,
    /// Perturb weights.
    Weights,
    /// Full mutation round with the default rates.
    Mutate,
    /// Replace the genome by a child of itself and a fresh minimal genome.
    Cross { fitter: bool },
}

/// Structured fuzz input.
#[derive(Arbitrary, Debug)]
struct GrowInput {
    seed: u64,
    inputs: u8,
    outputs: u8,
    steps: Vec<Step>,
    values: Vec<f64>,
    budget: u8,
}

fuzz_target!(|input: GrowInput| {
    let inputs = usize::from(input.inputs % 8) + 1;
    let outputs = usize::from(input.outputs % 4) + 1;

    let mut rng = SmallRng::seed_from_u64(input.seed);
    let mut seq = Sequencer::new();
    let layout = IoLayout::allocate(inputs, outputs, &mut seq);
    let config = MutationConfig::default();
    let mut genome = Genome::minimal(&layout, &mut rng);

    for step in input.steps.iter().take(64) {
        match *step {
            Step::AddNode => {
                add_node(&mut genome, &mut seq, &mut rng);
            }
            Step::AddConnection => {
                add_connection(&mut genome, &mut seq, &mut rng);
            }
            Step::Weights => perturb_weights(&mut genome, 0.8, 2.0, &mut rng),
            Step::Mutate => mutate(&mut genome, &config, &mut seq, &mut rng),
            Step::Cross { fitter } => {
                let mut other = Genome::minimal(&layout, &mut rng);
                genome.set_fitness(if fitter { 1.0 } else { 0.0 });
                other.set_fitness(0.5);
                genome = crossover(&genome, &other, &config, &mut seq, &mut rng);
            }
        }
    }

    let mut values: Vec<f64> = input.values.iter().copied().take(inputs).collect();
    values.resize(inputs, 0.0);

    let budget = u32::from(input.budget % 16);
    for _ in 0..3 {
        let out = cartneat::neat::evaluate_with_budget(&mut genome, &values, budget)
            .expect("input count matches");
        assert_eq!(out.len(), outputs);
        for value in out {
            assert!(value.is_nan() || (0.0..=1.0).contains(&value));
        }
    }
});
