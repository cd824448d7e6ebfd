//! Error types for herd nodes.

use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running a node.
#[derive(Debug, Error)]
pub enum Error {
    /// Topology could not be loaded or validated
    #[error("Topology error: {0}")]
    Topology(#[from] herd_topology::TopologyError),

    /// Node name is not part of the topology
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Invalid configuration value
    #[error("Invalid config: {0}")]
    Config(String),

    /// No record for the requested client
    #[error("Not found: {0}")]
    NotFound(String),

    /// Places lookup failed
    #[error("Places error: {0}")]
    Places(#[from] PlacesError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the external places service.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// No answer within the configured wait
    #[error("places query timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport or HTTP status failure
    #[error("places request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Answer was not a JSON object with a `results` array
    #[error("malformed places response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for PlacesError {
    fn from(e: serde_json::Error) -> Self {
        PlacesError::Malformed(e.to_string())
    }
}
