use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Address-book entry for one peer node.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub addr: SocketAddr,
}

/// Everything a node needs to know at construction time.
///
/// Injected explicitly into `Node::new`; nothing in the core consults
/// process-wide state. Loadable from a JSON file, overridable by CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// This node's name on the ring. Generated when left empty.
    #[serde(default)]
    pub name: String,
    /// The other members of the cluster.
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    /// Partition count P; must be a power of two.
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    /// Replication factor N.
    #[serde(default = "default_replication")]
    pub replication: usize,
    /// Read quorum R, accepted for interop but not enforced as a blocking
    /// quorum wait.
    #[serde(default)]
    pub read_quorum: usize,
    /// Write quorum W, accepted for interop but not enforced as a blocking
    /// quorum wait.
    #[serde(default)]
    pub write_quorum: usize,
}

fn default_partitions() -> usize {
    32
}

fn default_replication() -> usize {
    3
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            peers: Vec::new(),
            partitions: default_partitions(),
            replication: default_replication(),
            read_quorum: 0,
            write_quorum: 0,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
