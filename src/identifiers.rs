//! Node identity and neighbor descriptors.

use serde::{Deserialize, Serialize};

/// Lowest port considered for the self-assigned listening socket.
pub const MIN_PORT: u16 = 20000;

/// Highest port considered for the self-assigned listening socket.
pub const MAX_PORT: u16 = 32767;

/// Opaque identifier of a simulated router in the overlay.
///
/// Informally written as a dotted-quad, but treated as an opaque string
/// everywhere in this crate: there is no IP-layer routing here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId::new(s)
    }
}

/// `(hostAddress, port)` at which a node's server listens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProcessEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ProcessEndpoint { host: host.into(), port }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ProcessEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Handshake status of a neighbor, tracked per port slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborStatus {
    Unknown,
    Init,
    TwoWay,
}

/// `(processEndpoint, nodeId, status, weightToReach)`.
///
/// The self-descriptor always carries `weight_to_reach == 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborDescriptor {
    pub endpoint: ProcessEndpoint,
    pub node_id: NodeId,
    pub status: NeighborStatus,
    pub weight_to_reach: i32,
}

impl NeighborDescriptor {
    pub fn new(endpoint: ProcessEndpoint, node_id: NodeId, weight_to_reach: i32) -> Self {
        NeighborDescriptor {
            endpoint,
            node_id,
            status: NeighborStatus::Unknown,
            weight_to_reach,
        }
    }

    pub fn this_node(endpoint: ProcessEndpoint, node_id: NodeId) -> Self {
        NeighborDescriptor {
            endpoint,
            node_id,
            status: NeighborStatus::TwoWay,
            weight_to_reach: 0,
        }
    }
}
