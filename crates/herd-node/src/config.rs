//! Node configuration.

use std::time::Duration;

use herd_topology::{NodeAddr, Topology};

use crate::error::{Error, Result};

/// Google Places nearby-search endpoint.
pub const DEFAULT_PLACES_URL: &str =
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// How long a WHATSAT waits for the places service.
pub const DEFAULT_PLACES_TIMEOUT: Duration = Duration::from_secs(1);

/// How long an outbound link may take to connect.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Places service settings.
#[derive(Debug, Clone)]
pub struct PlacesConfig {
    /// Nearby-search endpoint
    pub endpoint: String,

    /// API key sent with every query
    pub api_key: String,

    /// Bounded wait for one query
    pub timeout: Duration,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PLACES_URL.to_string(),
            api_key: String::new(),
            timeout: DEFAULT_PLACES_TIMEOUT,
        }
    }
}

/// Configuration for one herd node.
#[derive(Debug, Clone)]
pub struct HerdConfig {
    /// This node's name in the topology
    pub node_name: String,

    /// The whole herd's static graph
    pub topology: Topology,

    /// Bind host override (defaults to the topology's host for this node)
    pub listen_host: Option<String>,

    /// Connect timeout for outbound links
    pub dial_timeout: Duration,

    /// Places service
    pub places: PlacesConfig,
}

impl HerdConfig {
    /// Config for `node_name` in `topology` with default places settings.
    pub fn new(node_name: impl Into<String>, topology: Topology) -> Result<Self> {
        let node_name = node_name.into();
        if !topology.contains(&node_name) {
            return Err(Error::UnknownNode(node_name));
        }
        Ok(Self {
            node_name,
            topology,
            listen_host: None,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            places: PlacesConfig::default(),
        })
    }

    /// Create config from environment variables with sensible defaults.
    ///
    /// - `HERD_TOPOLOGY`: path to a topology JSON file (default: built-in herd)
    /// - `HERD_LISTEN_HOST`: bind host override
    /// - `HERD_DIAL_TIMEOUT_MS`: outbound connect timeout in milliseconds
    /// - `HERD_PLACES_URL`: nearby-search endpoint
    /// - `HERD_PLACES_API_KEY`: places API key
    /// - `HERD_PLACES_TIMEOUT_MS`: places wait in milliseconds
    pub fn from_env(node_name: &str) -> Result<Self> {
        let topology = match std::env::var("HERD_TOPOLOGY") {
            Ok(path) => Topology::from_file(path)?,
            Err(_) => Topology::default_herd(),
        };

        let mut config = Self::new(node_name, topology)?;

        config.listen_host = std::env::var("HERD_LISTEN_HOST").ok();
        if let Ok(ms) = std::env::var("HERD_DIAL_TIMEOUT_MS") {
            config.dial_timeout = millis("HERD_DIAL_TIMEOUT_MS", &ms)?;
        }

        if let Ok(url) = std::env::var("HERD_PLACES_URL") {
            config.places.endpoint = url;
        }
        config.places.api_key = std::env::var("HERD_PLACES_API_KEY").unwrap_or_default();

        if let Ok(ms) = std::env::var("HERD_PLACES_TIMEOUT_MS") {
            config.places.timeout = millis("HERD_PLACES_TIMEOUT_MS", &ms)?;
        }

        Ok(config)
    }

    /// Where this node listens.
    pub fn listen_addr(&self) -> Result<NodeAddr> {
        let addr = self
            .topology
            .addr(&self.node_name)
            .ok_or_else(|| Error::UnknownNode(self.node_name.clone()))?;
        Ok(match &self.listen_host {
            Some(host) => NodeAddr::new(host.clone(), addr.port),
            None => addr.clone(),
        })
    }
}

fn millis(var: &str, value: &str) -> Result<Duration> {
    value
        .parse()
        .map(Duration::from_millis)
        .map_err(|_| Error::Config(format!("{var}={value}")))
}
