//! Flooding of accepted location updates.
//!
//! # Rule
//!
//! ```text
//! upsert(record) applied?
//!   no  → stop (stale or duplicate; this is what ends flood cycles)
//!   yes → AT <self> <skew> <client> <pos> <time> <self>
//!         to every neighbor except the one that sent it
//! ```
//!
//! There is no retry queue. A hop that fails is dropped; a later update for
//! the same client, or the same update arriving through another neighbor,
//! covers it.

use herd_protocol::AtLine;
use tracing::{debug, info, warn};

use crate::herd::Herd;
use crate::links::PendingDial;
use crate::registry::LocationRecord;

/// Outcome of one propagation event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    /// The registry took the update
    pub applied: bool,
    /// Neighbors the line was queued for, in topology order
    pub forwarded: Vec<String>,
}

impl Herd {
    /// Accept `at` into the registry and flood it.
    ///
    /// `from` is the neighbor that relayed the update, or `None` when a
    /// client reported it to this node directly.
    pub async fn propagate(&self, at: AtLine, from: Option<&str>) -> Propagation {
        let client_id = at.observation.client_id.clone();
        let wire = at.relayed_by(self.name());

        let mut forwarded = Vec::new();
        let mut dials: Vec<PendingDial> = Vec::new();
        {
            let mut state = self.state().await;
            if !state.registry.upsert(LocationRecord::from_at(&at)) {
                debug!(
                    "Not propagating duplicate/outdated data for {} at {}",
                    client_id, at.observation.time
                );
                return Propagation::default();
            }
            info!("Added or updated {}: {}", client_id, at);

            let mut dropped = Vec::new();
            for neighbor in self.neighbors() {
                if from == Some(neighbor.as_str()) {
                    continue;
                }
                let (link, dial) = state.links.get_or_create(neighbor);
                if link.send_line(&wire) {
                    info!(
                        "Location update attempted from {} to {}",
                        self.name(),
                        neighbor
                    );
                    forwarded.push(neighbor.clone());
                } else {
                    dropped.push((neighbor.clone(), link.id));
                }
                dials.extend(dial);
            }

            for (neighbor, id) in dropped {
                state.links.remove(&neighbor, id);
                warn!(
                    "Dropped update for {} from {} to {}: link closed",
                    client_id,
                    self.name(),
                    neighbor
                );
            }
        }

        for dial in dials {
            if !self.request_dial(dial) {
                warn!("Dial queue closed at {}", self.name());
            }
        }

        Propagation {
            applied: true,
            forwarded,
        }
    }
}
