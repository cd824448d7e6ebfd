//! Node addresses and the neighbor graph.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::{Result, TopologyError, DEFAULT_BASE_PORT, DEFAULT_HERD};

/// Where a node listens for client and peer connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeAddr {
    /// Hostname or IP literal
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl NodeAddr {
    /// Create a new address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Address on localhost.
    pub fn localhost(port: u16) -> Self {
        Self::new("localhost", port)
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Static herd topology.
///
/// Built once, validated, then shared read-only by every component of a
/// node. Neighbor order is preserved as written so fan-out order is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTopology"))]
pub struct Topology {
    nodes: BTreeMap<String, NodeAddr>,
    neighbors: BTreeMap<String, Vec<String>>,
}

/// Unvalidated on-disk form.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTopology {
    nodes: BTreeMap<String, NodeAddr>,
    #[serde(default)]
    neighbors: BTreeMap<String, Vec<String>>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTopology> for Topology {
    type Error = TopologyError;

    fn try_from(raw: RawTopology) -> Result<Self> {
        Topology::new(raw.nodes, raw.neighbors)
    }
}

impl Topology {
    /// Build a topology, rejecting neighbor lists that point at unknown nodes.
    ///
    /// Duplicate entries within one neighbor list are collapsed, keeping the
    /// first occurrence. Nodes without a neighbor list get an empty one.
    pub fn new(
        nodes: BTreeMap<String, NodeAddr>,
        neighbors: BTreeMap<String, Vec<String>>,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut cleaned = BTreeMap::new();
        for (node, list) in neighbors {
            if !nodes.contains_key(&node) {
                return Err(TopologyError::UnknownNode(node));
            }
            let mut seen = HashSet::new();
            let mut ordered = Vec::with_capacity(list.len());
            for neighbor in list {
                if neighbor == node {
                    return Err(TopologyError::SelfLoop(node));
                }
                if !nodes.contains_key(&neighbor) {
                    return Err(TopologyError::UnknownNeighbor { node, neighbor });
                }
                if seen.insert(neighbor.clone()) {
                    ordered.push(neighbor);
                }
            }
            cleaned.insert(node, ordered);
        }
        for node in nodes.keys() {
            cleaned.entry(node.clone()).or_default();
        }

        Ok(Self {
            nodes,
            neighbors: cleaned,
        })
    }

    /// The built-in five-node herd on localhost.
    pub fn default_herd() -> Self {
        let nodes = DEFAULT_HERD
            .iter()
            .zip(DEFAULT_BASE_PORT..)
            .map(|(name, port)| (name.to_string(), NodeAddr::localhost(port)))
            .collect();

        let edges: [(&str, [&str; 2]); 5] = [
            ("Alford", ["Hamilton", "Welsh"]),
            ("Ball", ["Holiday", "Welsh"]),
            ("Hamilton", ["Holiday", "Alford"]),
            ("Holiday", ["Ball", "Hamilton"]),
            ("Welsh", ["Alford", "Ball"]),
        ];
        let neighbors = edges
            .iter()
            .map(|(node, list)| {
                (
                    node.to_string(),
                    list.iter().map(|n| n.to_string()).collect(),
                )
            })
            .collect();

        Self { nodes, neighbors }
    }

    /// Parse a topology from JSON text.
    ///
    /// ```text
    /// {
    ///   "nodes": { "Alford": { "host": "localhost", "port": 11500 }, ... },
    ///   "neighbors": { "Alford": ["Hamilton", "Welsh"], ... }
    /// }
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a topology from a JSON file.
    #[cfg(feature = "serde")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Address of a node, if it exists.
    pub fn addr(&self, node: &str) -> Option<&NodeAddr> {
        self.nodes.get(node)
    }

    /// Whether the node is part of this topology.
    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    /// Ordered neighbors of a node. Unknown nodes have none.
    pub fn neighbors(&self, node: &str) -> &[String] {
        self.neighbors.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `b` appears in `a`'s neighbor list.
    pub fn is_neighbor(&self, a: &str, b: &str) -> bool {
        self.neighbors(a).iter().any(|n| n == b)
    }

    /// All node names, sorted.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false for a validated topology; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Edges `(a, b)` where `a` lists `b` but `b` does not list `a`.
    pub fn asymmetric_edges(&self) -> Vec<(&str, &str)> {
        let mut edges = Vec::new();
        for (node, list) in &self.neighbors {
            for neighbor in list {
                if !self.is_neighbor(neighbor, node) {
                    edges.push((node.as_str(), neighbor.as_str()));
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(names: &[&str]) -> BTreeMap<String, NodeAddr> {
        names
            .iter()
            .zip(9000u16..)
            .map(|(n, p)| (n.to_string(), NodeAddr::localhost(p)))
            .collect()
    }

    fn edges(list: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        list.iter()
            .map(|(n, ns)| (n.to_string(), ns.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn default_herd_is_symmetric() {
        let topo = Topology::default_herd();
        assert_eq!(topo.len(), 5);
        assert!(topo.asymmetric_edges().is_empty());
    }

    #[test]
    fn default_herd_neighbors_keep_order() {
        let topo = Topology::default_herd();
        assert_eq!(topo.neighbors("Alford"), ["Hamilton", "Welsh"]);
        assert_eq!(topo.neighbors("Hamilton"), ["Holiday", "Alford"]);
        assert_eq!(topo.addr("Welsh"), Some(&NodeAddr::localhost(11504)));
    }

    #[test]
    fn unknown_node_has_no_neighbors() {
        let topo = Topology::default_herd();
        assert!(topo.neighbors("Nowhere").is_empty());
        assert!(!topo.contains("Nowhere"));
    }

    #[test]
    fn rejects_unknown_neighbor() {
        let err = Topology::new(addrs(&["A", "B"]), edges(&[("A", &["C"])])).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownNeighbor { .. }));
    }

    #[test]
    fn rejects_neighbor_list_for_unknown_node() {
        let err = Topology::new(addrs(&["A"]), edges(&[("Z", &["A"])])).unwrap_err();
        assert!(matches!(err, TopologyError::UnknownNode(n) if n == "Z"));
    }

    #[test]
    fn rejects_self_loop() {
        let err = Topology::new(addrs(&["A", "B"]), edges(&[("A", &["A"])])).unwrap_err();
        assert!(matches!(err, TopologyError::SelfLoop(_)));
    }

    #[test]
    fn rejects_empty() {
        let err = Topology::new(BTreeMap::new(), BTreeMap::new()).unwrap_err();
        assert!(matches!(err, TopologyError::Empty));
    }

    #[test]
    fn collapses_duplicate_neighbors() {
        let topo = Topology::new(
            addrs(&["A", "B", "C"]),
            edges(&[("A", &["B", "C", "B"])]),
        )
        .unwrap();
        assert_eq!(topo.neighbors("A"), ["B", "C"]);
        assert!(topo.neighbors("B").is_empty());
    }

    #[test]
    fn reports_asymmetric_edges() {
        let topo = Topology::new(
            addrs(&["A", "B", "C"]),
            edges(&[("A", &["B", "C"]), ("B", &["A"])]),
        )
        .unwrap();
        assert_eq!(topo.asymmetric_edges(), vec![("A", "C")]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_from_json_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "nodes": {{
                    "North": {{ "host": "127.0.0.1", "port": 12000 }},
                    "South": {{ "host": "127.0.0.1", "port": 12001 }}
                }},
                "neighbors": {{ "North": ["South"], "South": ["North"] }}
            }}"#
        )
        .unwrap();

        let topo = Topology::from_file(file.path()).unwrap();
        assert_eq!(topo.addr("South"), Some(&NodeAddr::new("127.0.0.1", 12001)));
        assert!(topo.is_neighbor("North", "South"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_is_validated() {
        let err = Topology::from_json(
            r#"{ "nodes": { "A": { "host": "h", "port": 1 } }, "neighbors": { "A": ["B"] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::Json(_)));
    }
}
