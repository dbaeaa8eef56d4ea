//! Inspect command implementation.

use super::CliError;
use cartneat::neat::{NodeKind, Sequencer, load_genome};
use std::path::Path;

/// Execute the inspect command.
///
/// # Errors
///
/// Returns an error if the genome cannot be loaded or rejects the inputs.
pub(crate) fn execute(file: &Path, inputs: Option<&[f64]>) -> Result<(), CliError> {
    let mut genome = load_genome(file, &mut Sequencer::new())?;

    println!("Genome: {}", file.display());
    println!("  Fitness: {:.4}", genome.fitness());
    println!(
        "  Nodes: {} ({} inputs, {} hidden, {} outputs)",
        genome.node_count(),
        genome.inputs().len(),
        genome.hidden_count(),
        genome.outputs().len()
    );
    println!(
        "  Connections: {} ({} enabled)",
        genome.connection_count(),
        genome.enabled_connection_count()
    );
    println!();

    println!("Nodes:");
    for node in genome.nodes() {
        if node.kind == NodeKind::Input {
            println!("  {:>4}  {}", node.id, node.kind);
        } else {
            println!("  {:>4}  {} {}", node.id, node.kind, node.activation);
        }
    }

    println!("Connections:");
    for c in genome.connections() {
        println!(
            "  {:>4}  {:>4} -> {:<4} {:>9.4}{}",
            c.id,
            c.from,
            c.to,
            c.weight,
            if c.enabled { "" } else { "  (disabled)" }
        );
    }

    if let Some(inputs) = inputs {
        let outputs = genome.evaluate(inputs)?;
        println!();
        println!("Inputs:  {inputs:?}");
        println!("Outputs: {outputs:?}");
    }

    Ok(())
}
