//! Herd Topology
//!
//! The static peer graph of a herd: which nodes exist, where they listen,
//! and which nodes each one talks to.
//!
//! # Shape
//!
//! The graph is a directed adjacency map, node name → ordered neighbor list,
//! plus node name → (host, port). It is read once at startup and never
//! changes afterwards. Edges are expected to be symmetric (if Alford lists
//! Hamilton, Hamilton lists Alford) but the structure does not force it;
//! [`Topology::asymmetric_edges`] reports the ones that are not.
//!
//! # Default herd
//!
//! [`Topology::default_herd`] is the five-node herd used for local runs:
//!
//! ```text
//! Alford ─── Hamilton ─── Holiday
//!   │                        │
//! Welsh ──────── Ball ───────┘
//! ```

mod error;
mod graph;

pub use error::{Result, TopologyError};
pub use graph::{NodeAddr, Topology};

/// Names of the built-in herd, in port order.
pub const DEFAULT_HERD: [&str; 5] = ["Alford", "Ball", "Hamilton", "Holiday", "Welsh"];

/// First port of the built-in herd; node `i` listens on `DEFAULT_BASE_PORT + i`.
pub const DEFAULT_BASE_PORT: u16 = 11500;
