//! Genome representation for neuroevolution.
//!
//! A genome is a small directed graph of [`Node`]s joined by weighted
//! [`Connection`]s. Both live in id-keyed maps owned by the [`Genome`]; every
//! cross-reference (endpoints, in/out edge lists) is an id, never a pointer.
//! The `inputs` and `outputs` lists fix the external I/O contract and keep
//! their length for the whole lineage.

use crate::neat::activation::Activation;
use crate::neat::sequencer::{ConnectionId, NodeId, Sequencer};
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Receives an externally assigned sensor value.
    Input,
    /// Internal node created by add-node mutation.
    Hidden,
    /// Produces one actuator value.
    Output,
}

impl NodeKind {
    /// Activation a freshly created node of this kind gets.
    #[must_use]
    pub const fn default_activation(self) -> Activation {
        match self {
            Self::Input => Activation::PassThrough,
            Self::Hidden => Activation::Identity,
            Self::Output => Activation::Sigmoid,
        }
    }

    /// Name used in persisted genomes.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Hidden => "Hidden",
            Self::Output => "Output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a node type name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown node type: {0:?}")]
pub struct UnknownNodeKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownNodeKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Input" => Ok(Self::Input),
            "Hidden" => Ok(Self::Hidden),
            "Output" => Ok(Self::Output),
            other => Err(UnknownNodeKind(other.to_string())),
        }
    }
}

/// A neuron.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique id within the genome.
    pub id: NodeId,
    /// Input, hidden or output.
    pub kind: NodeKind,
    /// Function applied to the weighted input sum.
    pub activation: Activation,
    /// Last computed (or, for inputs, assigned) value.
    pub value: f64,
    /// Connections ending at this node, in insertion order.
    pub in_edges: Vec<ConnectionId>,
    /// Connections starting at this node, in insertion order.
    pub out_edges: Vec<ConnectionId>,
    /// Times this node was computed during the current evaluation pass.
    pub visit_count: u32,
}

impl Node {
    /// Create an unlinked node with the default activation for `kind`.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self::with_activation(id, kind, kind.default_activation())
    }

    /// Create an unlinked node with an explicit activation.
    #[must_use]
    pub fn with_activation(id: NodeId, kind: NodeKind, activation: Activation) -> Self {
        Self {
            id,
            kind,
            activation,
            value: 0.0,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            visit_count: 0,
        }
    }

    /// Copy of the gene without runtime state or edge lists.
    #[must_use]
    pub fn unlinked(&self) -> Self {
        Self::with_activation(self.id, self.kind, self.activation)
    }

    /// Record an incoming connection. Adding the same id twice is a no-op.
    pub fn add_in_connection(&mut self, id: ConnectionId) {
        if !self.in_edges.contains(&id) {
            self.in_edges.push(id);
        }
    }

    /// Record an outgoing connection. Adding the same id twice is a no-op.
    pub fn add_out_connection(&mut self, id: ConnectionId) {
        if !self.out_edges.contains(&id) {
            self.out_edges.push(id);
        }
    }
}

// Structural equality: runtime values and visit counters are ignored.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.activation == other.activation
            && self.in_edges == other.in_edges
            && self.out_edges == other.out_edges
    }
}

/// A weighted, directed edge between two nodes.
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    /// Innovation number.
    pub id: ConnectionId,
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Multiplier applied to the source value.
    pub weight: f64,
    /// Disabled connections are skipped during evaluation.
    pub enabled: bool,
    /// Traversals during the current evaluation pass.
    pub visit_count: u32,
}

impl Connection {
    /// Create an enabled connection.
    #[must_use]
    pub fn new(id: ConnectionId, from: NodeId, to: NodeId, weight: f64) -> Self {
        Self {
            id,
            from,
            to,
            weight,
            enabled: true,
            visit_count: 0,
        }
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.from == other.from
            && self.to == other.to
            && self.weight.to_bits() == other.weight.to_bits()
            && self.enabled == other.enabled
    }
}

/// The shared innovation ids of a run's minimal genomes.
///
/// Every minimal genome built from the same layout carries the same input,
/// output and initial connection ids, so crossover between two of them
/// matches genes instead of doubling the input set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoLayout {
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    /// `(id, from, to)` for every input/output pair.
    links: Vec<(ConnectionId, NodeId, NodeId)>,
}

impl IoLayout {
    /// Allocate fresh ids for `input_count` inputs and `output_count` outputs.
    #[must_use]
    pub fn allocate(input_count: usize, output_count: usize, seq: &mut Sequencer) -> Self {
        let inputs: Vec<NodeId> = (0..input_count).map(|_| seq.next_node_id()).collect();
        let outputs: Vec<NodeId> = (0..output_count).map(|_| seq.next_node_id()).collect();

        let mut links = Vec::with_capacity(input_count * output_count);
        for &to in &outputs {
            for &from in &inputs {
                links.push((seq.next_connection_id(), from, to));
            }
        }

        Self {
            inputs,
            outputs,
            links,
        }
    }

    /// Derive a layout from an existing genome, reusing its I/O node ids and
    /// any direct input-to-output connection ids it already has.
    ///
    /// The sequencer's floors must already cover the genome's ids.
    #[must_use]
    pub fn from_genome(genome: &Genome, seq: &mut Sequencer) -> Self {
        let mut links = Vec::with_capacity(genome.inputs.len() * genome.outputs.len());
        for &to in &genome.outputs {
            for &from in &genome.inputs {
                let id = genome
                    .connections
                    .values()
                    .find(|c| c.from == from && c.to == to)
                    .map_or_else(|| seq.next_connection_id(), |c| c.id);
                links.push((id, from, to));
            }
        }

        Self {
            inputs: genome.inputs.clone(),
            outputs: genome.outputs.clone(),
            links,
        }
    }

    /// Input node ids in sensor order.
    #[must_use]
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Output node ids in actuator order.
    #[must_use]
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }
}

/// One candidate network.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) connections: BTreeMap<ConnectionId, Connection>,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) outputs: Vec<NodeId>,
    pub(crate) fitness: f64,
    pub(crate) alive: bool,
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            fitness: 0.0,
            alive: true,
        }
    }
}

impl Genome {
    /// Build a minimal genome: every input wired to every output with a
    /// uniform random weight in `[-1, 1]`.
    #[must_use]
    pub fn minimal<R: Rng>(layout: &IoLayout, rng: &mut R) -> Self {
        let mut genome = Self::default();

        for &id in &layout.inputs {
            genome.insert_node(Node::new(id, NodeKind::Input));
            genome.inputs.push(id);
        }
        for &id in &layout.outputs {
            genome.insert_node(Node::new(id, NodeKind::Output));
            genome.outputs.push(id);
        }
        for &(id, from, to) in &layout.links {
            let weight = rng.gen_range(-1.0..=1.0);
            genome.insert_connection(Connection::new(id, from, to, weight));
        }

        genome
    }

    /// Build a genome from parts, trusting the caller on every invariant.
    ///
    /// Connections are linked into their endpoints' edge lists.
    #[must_use]
    pub fn from_parts(
        nodes: Vec<Node>,
        connections: Vec<Connection>,
        inputs: Vec<NodeId>,
        outputs: Vec<NodeId>,
        fitness: f64,
    ) -> Self {
        let mut genome = Self {
            inputs,
            outputs,
            fitness,
            ..Self::default()
        };
        for node in nodes {
            genome.insert_node(node);
        }
        for connection in connections {
            genome.insert_connection(connection);
        }
        genome
    }

    /// Insert a node. An existing node with the same id is kept.
    pub fn insert_node(&mut self, node: Node) {
        self.nodes.entry(node.id).or_insert(node);
    }

    /// Insert a connection and link it into both endpoints.
    ///
    /// Endpoints that are not present are left unlinked; callers are
    /// expected to insert nodes first.
    pub fn insert_connection(&mut self, connection: Connection) {
        let (id, from, to) = (connection.id, connection.from, connection.to);
        self.connections.insert(id, connection);
        if let Some(node) = self.nodes.get_mut(&from) {
            node.add_out_connection(id);
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.add_in_connection(id);
        }
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All connections, ordered by id.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a connection.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Mutable access to a connection.
    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Input node ids in sensor order.
    #[must_use]
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Output node ids in actuator order.
    #[must_use]
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections, enabled or not.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of enabled connections.
    #[must_use]
    pub fn enabled_connection_count(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    /// Number of hidden nodes.
    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| n.kind == NodeKind::Hidden)
            .count()
    }

    /// Whether a connection from `from` to `to` exists (enabled or not).
    #[must_use]
    pub fn has_connection_between(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes.get(&from).is_some_and(|node| {
            node.out_edges
                .iter()
                .filter_map(|id| self.connections.get(id))
                .any(|c| c.to == to)
        })
    }

    /// Highest node id, if any.
    #[must_use]
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.keys().next_back().copied()
    }

    /// Highest connection id, if any.
    #[must_use]
    pub fn max_connection_id(&self) -> Option<ConnectionId> {
        self.connections.keys().next_back().copied()
    }

    /// Fitness of the last finished evaluation.
    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Overwrite the fitness.
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Whether the genome is still being evaluated this generation.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Finalize this generation's fitness and mark the genome dead.
    pub fn kill(&mut self, fitness: f64) {
        self.fitness = fitness;
        self.alive = false;
    }

    /// Clear fitness and revive, keeping the structure unchanged.
    pub fn reset(&mut self) {
        self.fitness = 0.0;
        self.alive = true;
        for node in self.nodes.values_mut() {
            node.value = 0.0;
            node.visit_count = 0;
        }
        for connection in self.connections.values_mut() {
            connection.visit_count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn layout(inputs: usize, outputs: usize) -> (IoLayout, Sequencer) {
        let mut seq = Sequencer::new();
        let layout = IoLayout::allocate(inputs, outputs, &mut seq);
        (layout, seq)
    }

    #[test]
    fn test_minimal_genome_shape() {
        let mut rng = SmallRng::seed_from_u64(12345);
        let (layout, _) = layout(5, 1);
        let genome = Genome::minimal(&layout, &mut rng);

        assert_eq!(genome.inputs().len(), 5);
        assert_eq!(genome.outputs().len(), 1);
        assert_eq!(genome.node_count(), 6);
        assert_eq!(genome.connection_count(), 5);
        assert!(genome.is_alive());

        for c in genome.connections() {
            assert!((-1.0..=1.0).contains(&c.weight));
            assert!(c.enabled);
            assert_eq!(genome.node(c.from).map(|n| n.kind), Some(NodeKind::Input));
            assert_eq!(genome.node(c.to).map(|n| n.kind), Some(NodeKind::Output));
        }
    }

    #[test]
    fn test_minimal_genomes_share_innovation_ids() {
        let mut rng = SmallRng::seed_from_u64(7);
        let (layout, _) = layout(3, 2);
        let a = Genome::minimal(&layout, &mut rng);
        let b = Genome::minimal(&layout, &mut rng);

        let ids_a: Vec<_> = a.connections().map(|c| c.id).collect();
        let ids_b: Vec<_> = b.connections().map(|c| c.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(a.inputs(), b.inputs());
        assert_ne!(a, b, "weights are drawn independently");
    }

    #[test]
    fn test_layout_consumes_sequencer() {
        let (layout, seq) = layout(5, 1);
        assert_eq!(layout.inputs(), &[0, 1, 2, 3, 4]);
        assert_eq!(layout.outputs(), &[5]);
        assert_eq!(seq.peek_node_id(), 6);
        assert_eq!(seq.peek_connection_id(), 5);
    }

    #[test]
    fn test_layout_from_genome_reuses_ids() {
        let mut rng = SmallRng::seed_from_u64(1);
        let (original, mut seq) = layout(2, 1);
        let genome = Genome::minimal(&original, &mut rng);

        let derived = IoLayout::from_genome(&genome, &mut seq);
        assert_eq!(derived, original);
        assert_eq!(seq.peek_connection_id(), 2);
    }

    #[test]
    fn test_edge_linking_is_idempotent() {
        let mut node = Node::new(0, NodeKind::Hidden);
        node.add_in_connection(4);
        node.add_in_connection(4);
        node.add_out_connection(9);
        node.add_out_connection(9);

        assert_eq!(node.in_edges, vec![4]);
        assert_eq!(node.out_edges, vec![9]);
    }

    #[test]
    fn test_insert_connection_links_endpoints() {
        let mut genome = Genome::default();
        genome.insert_node(Node::new(0, NodeKind::Input));
        genome.insert_node(Node::new(1, NodeKind::Output));
        genome.insert_connection(Connection::new(3, 0, 1, 0.5));
        genome.insert_connection(Connection::new(3, 0, 1, 0.5));

        assert_eq!(genome.node(0).map(|n| n.out_edges.clone()), Some(vec![3]));
        assert_eq!(genome.node(1).map(|n| n.in_edges.clone()), Some(vec![3]));
        assert!(genome.has_connection_between(0, 1));
        assert!(!genome.has_connection_between(1, 0));
    }

    #[test]
    fn test_default_activations() {
        assert_eq!(NodeKind::Input.default_activation(), Activation::PassThrough);
        assert_eq!(NodeKind::Hidden.default_activation(), Activation::Identity);
        assert_eq!(NodeKind::Output.default_activation(), Activation::Sigmoid);
    }

    #[test]
    fn test_kill_and_reset() {
        let mut rng = SmallRng::seed_from_u64(3);
        let (layout, _) = layout(2, 1);
        let mut genome = Genome::minimal(&layout, &mut rng);

        genome.kill(4.5);
        assert!(!genome.is_alive());
        assert!((genome.fitness() - 4.5).abs() < f64::EPSILON);

        let before: Vec<_> = genome.connections().copied().collect();
        genome.reset();
        assert!(genome.is_alive());
        assert!(genome.fitness().abs() < f64::EPSILON);
        let after: Vec<_> = genome.connections().copied().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_max_ids() {
        let mut rng = SmallRng::seed_from_u64(3);
        let (layout, _) = layout(4, 2);
        let genome = Genome::minimal(&layout, &mut rng);

        assert_eq!(genome.max_node_id(), Some(5));
        assert_eq!(genome.max_connection_id(), Some(7));
        assert_eq!(Genome::default().max_node_id(), None);
    }

    #[test]
    fn test_node_kind_parsing() {
        for kind in [NodeKind::Input, NodeKind::Hidden, NodeKind::Output] {
            assert_eq!(kind.name().parse::<NodeKind>(), Ok(kind));
        }
        let err = "Bias".parse::<NodeKind>().unwrap_err();
        assert_eq!(err, UnknownNodeKind("Bias".to_string()));
        assert_eq!(err.to_string(), "unknown node type: \"Bias\"");
    }
}
