//! Error types for swarmmap-graph.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::NodeId;

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which telemetry payload a record carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Position,
    Status,
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Position => f.write_str("position"),
            Payload::Status => f.write_str("status"),
        }
    }
}

/// Errors that can occur while building or configuring a graph.
///
/// Every per-record error leaves the graph exactly as it was before the
/// insert was attempted.
#[derive(Debug, Error)]
pub enum Error {
    /// A position field fell outside its physical bounds (or was NaN).
    #[error("node {id}: {field} {value} out of range")]
    OutOfRange {
        id: NodeId,
        field: &'static str,
        value: f64,
    },

    /// A second payload of the same kind arrived for a node.
    #[error("node {id}: duplicate {payload} record")]
    DuplicateId { id: NodeId, payload: Payload },

    /// The node arena could not grow.
    #[error("allocation failure: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// A configuration override could not be parsed.
    #[error("invalid config value for {key}: {value:?}")]
    Config { key: &'static str, value: String },
}
