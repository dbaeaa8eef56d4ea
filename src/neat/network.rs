//! Network evaluation.
//!
//! Outputs are pulled recursively: each output node sums its enabled
//! in-edges, recursing into upstream nodes. Mutation may introduce cycles,
//! so every connection carries a visit budget per pass. Once a connection
//! has been traversed more than `budget` times, it contributes its upstream
//! node's cached value instead of recursing. The number of recursive calls
//! is therefore bounded by `budget * connection_count`.

use crate::error::EvaluationError;
use crate::neat::genome::{Connection, Genome, Node, NodeKind};
use crate::neat::sequencer::{ConnectionId, NodeId};
use std::collections::BTreeMap;

/// Default traversals allowed per connection within one pass.
pub const VISIT_BUDGET: u32 = 10;

impl Genome {
    /// Evaluate the network with the default [`VISIT_BUDGET`].
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::InputCountMismatch`] if `inputs` does not
    /// have one value per input node.
    pub fn evaluate(&mut self, inputs: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        evaluate_with_budget(self, inputs, VISIT_BUDGET)
    }
}

/// Evaluate `genome` on `inputs` with an explicit per-connection budget.
///
/// Output values are returned in `genome.outputs()` order. Node values are
/// cached on the genome and survive between calls.
///
/// # Errors
///
/// Returns [`EvaluationError::InputCountMismatch`] if `inputs` does not have
/// one value per input node. The genome is left untouched in that case.
pub fn evaluate_with_budget(
    genome: &mut Genome,
    inputs: &[f64],
    budget: u32,
) -> Result<Vec<f64>, EvaluationError> {
    if inputs.len() != genome.inputs.len() {
        return Err(EvaluationError::InputCountMismatch {
            expected: genome.inputs.len(),
            actual: inputs.len(),
        });
    }

    for connection in genome.connections.values_mut() {
        connection.visit_count = 0;
    }
    for node in genome.nodes.values_mut() {
        node.visit_count = 0;
    }
    for (id, &value) in genome.inputs.iter().zip(inputs) {
        if let Some(node) = genome.nodes.get_mut(id) {
            node.value = value;
        }
    }

    let mut pass = Pass {
        nodes: &mut genome.nodes,
        connections: &mut genome.connections,
        budget,
    };
    Ok(genome.outputs.iter().map(|&id| pass.compute(id)).collect())
}

/// Mutable view of one genome for the duration of an evaluation pass.
struct Pass<'a> {
    nodes: &'a mut BTreeMap<NodeId, Node>,
    connections: &'a mut BTreeMap<ConnectionId, Connection>,
    budget: u32,
}

impl Pass<'_> {
    fn compute(&mut self, id: NodeId) -> f64 {
        let Some(node) = self.nodes.get_mut(&id) else {
            return 0.0;
        };
        node.visit_count = node.visit_count.saturating_add(1);
        if node.kind == NodeKind::Input {
            return node.value;
        }

        let activation = node.activation;
        let in_edges = node.in_edges.clone();

        let mut sum = 0.0;
        for edge in in_edges {
            let Some(connection) = self.connections.get_mut(&edge) else {
                continue;
            };
            if !connection.enabled {
                continue;
            }
            connection.visit_count = connection.visit_count.saturating_add(1);
            let (from, weight) = (connection.from, connection.weight);

            let upstream = if connection.visit_count > self.budget {
                self.cached(from)
            } else {
                self.compute(from)
            };
            sum += upstream * weight;
        }

        let value = activation.apply(sum);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.value = value;
        }
        value
    }

    fn cached(&self, id: NodeId) -> f64 {
        self.nodes.get(&id).map_or(0.0, |node| node.value)
    }
}
