//! Innovation-number sequencing for nodes and connections.
//!
//! Every structural gene minted during a run takes its id from one
//! [`Sequencer`]. Equal connection ids in two genomes mean "the same gene",
//! which is what crossover matches on. The sequencer is an ordinary value
//! owned by the population and handed out as `&mut Sequencer`; there is no
//! process-wide instance.

/// Identifier of a node within a genome.
pub type NodeId = u32;

/// Identifier (innovation number) of a connection.
pub type ConnectionId = u32;

/// Monotonic id allocator for node and connection genes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sequencer {
    next_node: NodeId,
    next_connection: ConnectionId,
}

impl Sequencer {
    /// Create a sequencer that starts both counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_node: 0,
            next_connection: 0,
        }
    }

    /// Issue the next node id.
    pub fn next_node_id(&mut self) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        id
    }

    /// Issue the next connection id.
    pub fn next_connection_id(&mut self) -> ConnectionId {
        let id = self.next_connection;
        self.next_connection += 1;
        id
    }

    /// The id the next call to [`Self::next_node_id`] will return.
    #[must_use]
    pub const fn peek_node_id(&self) -> NodeId {
        self.next_node
    }

    /// The id the next call to [`Self::next_connection_id`] will return.
    #[must_use]
    pub const fn peek_connection_id(&self) -> ConnectionId {
        self.next_connection
    }

    /// Make sure the next node id is at least `floor`. Never lowers it.
    pub fn raise_node_floor(&mut self, floor: NodeId) {
        self.next_node = self.next_node.max(floor);
    }

    /// Make sure the next connection id is at least `floor`. Never lowers it.
    pub fn raise_connection_floor(&mut self, floor: ConnectionId) {
        self.next_connection = self.next_connection.max(floor);
    }
}
