//! Mutation operators for neuroevolution.
//!
//! Mutations are structural (add a node by splitting a connection, add a new
//! connection) or parametric (perturb weights, toggle connections). A full
//! pass runs each step in a fixed order, each gated by its own probability.

use crate::neat::genome::{Connection, Genome, Node, NodeKind};
use crate::neat::sequencer::{ConnectionId, NodeId, Sequencer};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Configuration for mutation operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability of splitting a connection with a new hidden node.
    pub add_node_rate: f64,
    /// Probability of adding a new connection.
    pub add_connection_rate: f64,
    /// Per-connection probability of perturbing the weight.
    pub weight_mutation_rate: f64,
    /// Weight deltas are drawn from `[-range, range]`.
    pub weight_perturbation_range: f64,
    /// Per-connection probability of flipping the enabled flag.
    pub toggle_enabled_rate: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            add_node_rate: 0.1,
            add_connection_rate: 0.1,
            weight_mutation_rate: 0.8,
            weight_perturbation_range: 0.1,
            toggle_enabled_rate: 0.1,
        }
    }
}

/// Genes created by a successful add-node mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSplit {
    /// The connection that was disabled.
    pub split: ConnectionId,
    /// The new hidden node.
    pub node: NodeId,
    /// `split.from -> node`.
    pub incoming: ConnectionId,
    /// `node -> split.to`.
    pub outgoing: ConnectionId,
}

/// Mutate a genome in place.
///
/// Steps, in order: add-node, add-connection, weight perturbation, enable
/// toggle. New genes take their ids from `seq`.
pub fn mutate<R: Rng>(
    genome: &mut Genome,
    config: &MutationConfig,
    seq: &mut Sequencer,
    rng: &mut R,
) {
    if rng.gen_bool(config.add_node_rate) {
        if let Some(split) = add_node(genome, seq, rng) {
            trace!(node = split.node, split = split.split, "add-node mutation");
        }
    }

    if rng.gen_bool(config.add_connection_rate) {
        if let Some(id) = add_connection(genome, seq, rng) {
            trace!(connection = id, "add-connection mutation");
        }
    }

    perturb_weights(
        genome,
        config.weight_mutation_rate,
        config.weight_perturbation_range,
        rng,
    );
    toggle_connections(genome, config.toggle_enabled_rate, rng);
}

/// Split a uniformly chosen connection with a new hidden node.
///
/// The chosen connection is disabled and replaced by two fresh connections
/// through the new node, each with a random weight in `[-1, 1]`. Returns
/// `None` without touching the genome if there are no connections.
pub fn add_node<R: Rng>(
    genome: &mut Genome,
    seq: &mut Sequencer,
    rng: &mut R,
) -> Option<NodeSplit> {
    if genome.connections.is_empty() {
        return None;
    }

    let index = rng.gen_range(0..genome.connections.len());
    let (split, from, to) = {
        let connection = genome.connections.values_mut().nth(index)?;
        connection.enabled = false;
        (connection.id, connection.from, connection.to)
    };

    let node = seq.next_node_id();
    genome.insert_node(Node::new(node, NodeKind::Hidden));

    let incoming = seq.next_connection_id();
    let weight = rng.gen_range(-1.0..=1.0);
    genome.insert_connection(Connection::new(incoming, from, node, weight));

    let outgoing = seq.next_connection_id();
    let weight = rng.gen_range(-1.0..=1.0);
    genome.insert_connection(Connection::new(outgoing, node, to, weight));

    Some(NodeSplit {
        split,
        node,
        incoming,
        outgoing,
    })
}

/// Connect two uniformly chosen nodes.
///
/// Rejected (returns `None`) when the source is an output, the destination
/// is an input, or the pair is already connected. Self-loops are allowed;
/// the evaluator's visit budget bounds them.
pub fn add_connection<R: Rng>(
    genome: &mut Genome,
    seq: &mut Sequencer,
    rng: &mut R,
) -> Option<ConnectionId> {
    let count = genome.nodes.len();
    if count == 0 {
        return None;
    }

    let from = genome.nodes.values().nth(rng.gen_range(0..count))?;
    let to = genome.nodes.values().nth(rng.gen_range(0..count))?;

    if from.kind == NodeKind::Output || to.kind == NodeKind::Input {
        return None;
    }
    let (from, to) = (from.id, to.id);
    if genome.has_connection_between(from, to) {
        return None;
    }

    let id = seq.next_connection_id();
    let weight = rng.gen_range(-1.0..=1.0);
    genome.insert_connection(Connection::new(id, from, to, weight));
    Some(id)
}

/// Add a uniform delta in `[-range, range]` to each connection's weight,
/// each with independent probability `rate`.
pub fn perturb_weights<R: Rng>(genome: &mut Genome, rate: f64, range: f64, rng: &mut R) {
    for connection in genome.connections.values_mut() {
        if rng.gen_bool(rate) {
            connection.weight += rng.gen_range(-range..=range);
        }
    }
}

/// Flip each connection's enabled flag with independent probability `rate`.
pub fn toggle_connections<R: Rng>(genome: &mut Genome, rate: f64, rng: &mut R) {
    for connection in genome.connections.values_mut() {
        if rng.gen_bool(rate) {
            connection.enabled = !connection.enabled;
        }
    }
}
