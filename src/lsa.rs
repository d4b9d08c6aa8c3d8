//! Link-State Advertisements.

use serde::{Deserialize, Serialize};

use crate::identifiers::NodeId;

/// Sentinel flagging a router that has never advertised anything.
pub const NO_PREVIOUS: i32 = i32::MIN;

/// `(neighborNodeId, portIndexAtOrigin, weight)`.
///
/// One per active link owned by the advertising node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub neighbor_node_id: NodeId,
    pub port_index_at_origin: usize,
    pub weight: i32,
}

/// `(originNodeId, seqNumber, hasShutdown, links)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lsa {
    pub origin_node_id: NodeId,
    pub seq_number: i32,
    pub has_shutdown: bool,
    pub links: Vec<LinkDescription>,
}

impl Lsa {
    /// The never-advertised state for a node that has not yet run a
    /// handshake.
    pub fn never_advertised(origin_node_id: NodeId) -> Self {
        Lsa {
            origin_node_id,
            seq_number: NO_PREVIOUS,
            has_shutdown: false,
            links: Vec::new(),
        }
    }

    /// Returns the next LSA for the same origin, with `links` replaced and
    /// the sequence number strictly incremented.
    pub fn next(&self, links: Vec<LinkDescription>) -> Self {
        let seq_number = if self.seq_number == NO_PREVIOUS { 0 } else { self.seq_number + 1 };
        Lsa {
            origin_node_id: self.origin_node_id.clone(),
            seq_number,
            has_shutdown: false,
            links,
        }
    }

    /// Returns a shutdown tombstone for the same origin, with a bumped
    /// sequence number.
    pub fn shutdown(&self) -> Self {
        let seq_number = if self.seq_number == NO_PREVIOUS { 0 } else { self.seq_number + 1 };
        Lsa {
            origin_node_id: self.origin_node_id.clone(),
            seq_number,
            has_shutdown: true,
            links: self.links.clone(),
        }
    }

    /// The "is this LSA fresher?" predicate: true when `candidate` should
    /// replace `stored` (`stored` being `None` counts as absent).
    pub fn is_fresher(stored: Option<&Lsa>, candidate: &Lsa) -> bool {
        match stored {
            None => true,
            Some(stored) => {
                candidate.seq_number > stored.seq_number || (stored.has_shutdown && !candidate.has_shutdown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresher_when_absent() {
        let candidate = Lsa::never_advertised(NodeId::new("a")).next(vec![]);
        assert!(Lsa::is_fresher(None, &candidate));
    }

    #[test]
    fn fresher_requires_strictly_greater_seq() {
        let base = Lsa::never_advertised(NodeId::new("a")).next(vec![]);
        let same_seq = Lsa {
            seq_number: base.seq_number,
            ..base.clone()
        };
        assert!(!Lsa::is_fresher(Some(&base), &same_seq));
        let newer = base.next(vec![]);
        assert!(Lsa::is_fresher(Some(&base), &newer));
    }

    #[test]
    fn resurrection_after_shutdown_always_accepted() {
        let base = Lsa::never_advertised(NodeId::new("a")).next(vec![]);
        let tombstone = base.shutdown();
        let resurrected = Lsa {
            seq_number: tombstone.seq_number - 1,
            has_shutdown: false,
            ..tombstone.clone()
        };
        assert!(Lsa::is_fresher(Some(&tombstone), &resurrected));
    }
}
