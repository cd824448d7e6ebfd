//! Herd Node - one member of a herd of location-registry servers
//!
//! Clients report where they are with `IAMAT` and ask what is near another
//! client with `WHATSAT`. Every node keeps the newest location per client
//! and floods accepted updates to its neighbors as `AT` lines, so any node
//! in a connected herd can eventually answer for any client.
//!
//! # Architecture
//!
//! - **Registry**: last-write-wins location records, keyed by client
//! - **Links**: one outbound queue per neighbor, dialed on first use
//! - **Propagation**: upsert, then fan out to every neighbor but the sender
//! - **Session**: line parsing and dispatch for one TCP connection
//! - **Places**: bounded-wait nearby-search for WHATSAT
//!
//! # Example
//!
//! ```no_run
//! use herd_node::{HerdConfig, HerdNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HerdConfig::from_env("Alford")?;
//!     let node = HerdNode::bind(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod herd;
pub mod links;
pub mod node;
pub mod places;
pub mod propagation;
pub mod registry;
pub mod session;

pub use config::{HerdConfig, PlacesConfig};
pub use error::{Error, PlacesError, Result};
pub use herd::{Herd, HerdState};
pub use links::{LinkDirection, LinkState, PeerLink, PeerLinkManager};
pub use node::HerdNode;
pub use places::{GooglePlaces, PlacesAdapter, PlacesAnswer, PlacesClient, PlacesReply};
pub use propagation::Propagation;
pub use registry::{LocationRecord, LocationRegistry};
