//! Error types for the neuroevolution engine.

use crate::neat::{ConnectionId, NodeId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to evaluate a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The caller supplied a sensor vector of the wrong length.
    #[error("expected {expected} inputs, got {actual}")]
    InputCountMismatch {
        /// Number of input nodes in the genome.
        expected: usize,
        /// Length of the supplied vector.
        actual: usize,
    },
}

/// A persisted genome that cannot be turned back into a [`crate::neat::Genome`].
#[derive(Debug, Error)]
pub enum FormatError {
    /// The document is not valid JSON or is missing fields.
    #[error("malformed genome document: {0}")]
    Json(#[from] serde_json::Error),
    /// Two nodes share an id.
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    /// Two connections share an id.
    #[error("duplicate connection id {0}")]
    DuplicateConnection(ConnectionId),
    /// A connection references a node that is not in the document.
    #[error("connection {connection} references missing node {node}")]
    DanglingEndpoint {
        /// Offending connection.
        connection: ConnectionId,
        /// Node id that could not be found.
        node: NodeId,
    },
    /// A node type other than `Input`, `Hidden` or `Output`.
    #[error("node {node} has unknown type {kind:?}")]
    UnknownNodeType {
        /// Offending node.
        node: NodeId,
        /// The type string as found in the document.
        kind: String,
    },
    /// An activation function name that is not recognised.
    #[error("node {node} has unknown activation function {function:?}")]
    UnknownActivation {
        /// Offending node.
        node: NodeId,
        /// The function name as found in the document.
        function: String,
    },
}

/// Failure to read or write persisted genomes.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file exists but its contents are invalid.
    #[error("invalid genome file {path}: {source}")]
    Format {
        /// File involved.
        path: PathBuf,
        /// What was wrong with it.
        #[source]
        source: FormatError,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, source: impl Into<FormatError>) -> Self {
        Self::Format {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Failure reported by the population manager.
#[derive(Debug, Error)]
pub enum PopulationError {
    /// A specimen's network rejected the sensor vector its unit produced.
    #[error("specimen {slot}: {source}")]
    Evaluation {
        /// Slot of the specimen in the current generation.
        slot: usize,
        /// Underlying error.
        #[source]
        source: EvaluationError,
    },
    /// A host hook named a slot that does not exist.
    #[error("no specimen in slot {0}")]
    UnknownSlot(usize),
    /// The specimen in this slot has already died this generation.
    #[error("specimen {0} is dead")]
    Dead(usize),
    /// Reading or writing the genome store failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// The generation budget is exhausted.
    #[error("evolution already finished")]
    Finished,
}
