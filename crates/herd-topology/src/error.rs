//! Error types for herd-topology.

use thiserror::Error;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised while building or loading a topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// A neighbor list names a node with no address.
    #[error("node {node} lists unknown neighbor {neighbor}")]
    UnknownNeighbor { node: String, neighbor: String },

    /// A neighbor list exists for a node with no address.
    #[error("neighbor list for unknown node {0}")]
    UnknownNode(String),

    /// A node lists itself as a neighbor.
    #[error("node {0} lists itself as a neighbor")]
    SelfLoop(String),

    /// The topology names no nodes at all.
    #[error("topology has no nodes")]
    Empty,

    /// The topology file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The topology file is not valid JSON for a topology.
    #[cfg(feature = "serde")]
    #[error("invalid topology JSON: {0}")]
    Json(#[from] serde_json::Error),
}
