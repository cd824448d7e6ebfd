//! Herd node: listener, accept loop and outbound dials.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::HerdConfig;
use crate::error::{Error, Result};
use crate::herd::{DialQueue, Herd};
use crate::places::{GooglePlaces, PlacesClient};
use crate::session;

/// A running herd node.
pub struct HerdNode {
    herd: Arc<Herd>,
    dials: DialQueue,
    listener: TcpListener,
}

impl HerdNode {
    /// Bind this node's topology port and use the configured places service.
    pub async fn bind(config: HerdConfig) -> Result<Self> {
        let places = Arc::new(GooglePlaces::new(&config.places));
        Self::bind_with_places(config, places).await
    }

    /// Bind this node's topology port with a custom places client.
    pub async fn bind_with_places(config: HerdConfig, places: Arc<dyn PlacesClient>) -> Result<Self> {
        let addr = config.listen_addr()?;
        let listener = TcpListener::bind((addr.host.as_str(), addr.port))
            .await
            .map_err(|e| Error::Config(format!("cannot listen on {addr}: {e}")))?;
        Self::with_listener(config, listener, places)
    }

    /// Run on an already bound listener.
    pub fn with_listener(
        config: HerdConfig,
        listener: TcpListener,
        places: Arc<dyn PlacesClient>,
    ) -> Result<Self> {
        for (a, b) in config.topology.asymmetric_edges() {
            warn!("Topology lists {} as a neighbor of {} but not the reverse", b, a);
        }
        let (herd, dials) = Herd::new(&config, places)?;
        Ok(Self {
            herd,
            dials,
            listener,
        })
    }

    /// Shared node context.
    pub fn herd(&self) -> &Arc<Herd> {
        &self.herd
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Serve until `shutdown` completes.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting node {} on {} with neighbors {:?}",
            self.herd.name(),
            self.local_addr()?,
            self.herd.neighbors()
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let herd = Arc::clone(&self.herd);
                        tokio::spawn(async move {
                            if let Err(e) = session::serve(herd, stream, addr).await {
                                warn!("Connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                },
                Some(dial) = self.dials.recv() => {
                    tokio::spawn(session::dial(Arc::clone(&self.herd), dial));
                }
                () = &mut shutdown => break,
            }
        }

        info!("Shutting down node {}", self.herd.name());
        Ok(())
    }
}
