//! Shared node context.
//!
//! Every connection task holds an `Arc<Herd>`. The registry and the link
//! table sit together behind one mutex so an upsert and the fan-out it
//! triggers happen as a single critical section.
//!
//! Links created during propagation are handed to the node's accept loop
//! through a [`DialQueue`]; the loop owns the outbound connect tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use herd_topology::Topology;
use tokio::sync::{mpsc, Mutex};

use crate::config::HerdConfig;
use crate::error::{Error, Result};
use crate::links::{PeerLinkManager, PendingDial};
use crate::places::{PlacesAdapter, PlacesAnswer, PlacesClient};
use crate::registry::{LocationRecord, LocationRegistry};

/// Mutable per-node state.
#[derive(Debug, Default)]
pub struct HerdState {
    pub registry: LocationRegistry,
    pub links: PeerLinkManager,
}

/// Outbound links waiting to be connected.
pub type DialQueue = mpsc::UnboundedReceiver<PendingDial>;

/// One herd node's shared components.
pub struct Herd {
    name: String,
    topology: Arc<Topology>,
    state: Mutex<HerdState>,
    places: PlacesAdapter,
    connections: AtomicUsize,
    dial_timeout: Duration,
    dialer: mpsc::UnboundedSender<PendingDial>,
}

impl Herd {
    /// Build the shared context for `config.node_name`.
    ///
    /// The returned queue yields every outbound link propagation creates;
    /// whoever holds it must connect them.
    pub fn new(
        config: &HerdConfig,
        places: Arc<dyn PlacesClient>,
    ) -> Result<(Arc<Self>, DialQueue)> {
        if !config.topology.contains(&config.node_name) {
            return Err(Error::UnknownNode(config.node_name.clone()));
        }
        let (dialer, queue) = mpsc::unbounded_channel();
        let herd = Arc::new(Self {
            name: config.node_name.clone(),
            topology: Arc::new(config.topology.clone()),
            state: Mutex::new(HerdState::default()),
            places: PlacesAdapter::new(places, config.places.timeout),
            connections: AtomicUsize::new(0),
            dial_timeout: config.dial_timeout,
            dialer,
        });
        Ok((herd, queue))
    }

    /// This node's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The static herd graph.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// This node's neighbors, in topology order.
    pub fn neighbors(&self) -> &[String] {
        self.topology.neighbors(&self.name)
    }

    /// Connect timeout for outbound links.
    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Lock the registry and link table.
    pub async fn state(&self) -> tokio::sync::MutexGuard<'_, HerdState> {
        self.state.lock().await
    }

    /// Snapshot of a client's record.
    pub async fn lookup(&self, client_id: &str) -> Option<LocationRecord> {
        self.state.lock().await.registry.lookup(client_id).cloned()
    }

    /// WHATSAT: places near a client's last known position.
    ///
    /// Fails with [`Error::NotFound`] before touching the places service
    /// when this node holds no record for the client.
    pub async fn whats_at(&self, client_id: &str, radius: u32, bound: usize) -> Result<PlacesAnswer> {
        let record = self
            .lookup(client_id)
            .await
            .ok_or_else(|| Error::NotFound(client_id.to_string()))?;
        Ok(self.places.query(&record, radius, bound).await?)
    }

    /// Hand a new outbound link to the dial queue. False if nobody is
    /// draining it.
    pub(crate) fn request_dial(&self, dial: PendingDial) -> bool {
        self.dialer.send(dial).is_ok()
    }

    /// Count a new connection; returns the live total.
    pub(crate) fn connection_opened(&self) -> usize {
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count a closed connection; returns the live total.
    pub(crate) fn connection_closed(&self) -> usize {
        self.connections.fetch_sub(1, Ordering::Relaxed) - 1
    }
}

/// Current POSIX time in seconds.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
