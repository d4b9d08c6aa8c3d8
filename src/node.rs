//! The per-process node: the shared, mutable singleton passed to every
//! component (server, handler, originator).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::identifiers::{NodeId, ProcessEndpoint};
use crate::lsa::{LinkDescription, Lsa};
use crate::lsd::LinkStateDatabase;
use crate::ports::PortsTable;

/// A node's identity, shared mutable state, and the `has_run_start` flag
/// gating `connect`.
///
/// Modeled as a single struct behind an `Arc` rather than process-wide
/// globals, so a test suite can instantiate many nodes in one process.
pub struct Node {
    pub node_id: NodeId,
    pub endpoint: ProcessEndpoint,
    pub ports: Mutex<PortsTable>,
    pub lsd: LinkStateDatabase,
    has_run_start: AtomicBool,
    /// Senders we have ever ingested an LSAUPDATE from, used to tell a
    /// first-time contact from a repeat one when deciding how to flood.
    contacted: Mutex<HashSet<NodeId>>,
}

impl Node {
    pub fn new(node_id: NodeId, endpoint: ProcessEndpoint) -> Self {
        let lsd = LinkStateDatabase::new();
        lsd.put(node_id.clone(), Lsa::never_advertised(node_id.clone()));
        Node {
            node_id,
            endpoint,
            ports: Mutex::new(PortsTable::new()),
            lsd,
            has_run_start: AtomicBool::new(false),
            contacted: Mutex::new(HashSet::new()),
        }
    }

    pub fn has_run_start(&self) -> bool {
        self.has_run_start.load(Ordering::SeqCst)
    }

    pub fn mark_start_run(&self) {
        self.has_run_start.store(true, Ordering::SeqCst);
    }

    /// Records `sender_id` as contacted and reports whether this is the
    /// first time it has ever been seen.
    pub fn mark_contacted(&self, sender_id: &NodeId) -> bool {
        self.contacted.lock().insert(sender_id.clone())
    }

    /// Rewrites this node's self-LSA to reflect the current ports table:
    /// one `LinkDescription` per occupied, TWO_WAY slot.
    ///
    /// Must be called any time a link is attached, detached, or has its
    /// weight changed, per the invariant that `lsd[self].links` stays in
    /// one-to-one correspondence with the TWO_WAY ports.
    pub fn regenerate_self_lsa(&self) {
        let links: Vec<LinkDescription> = {
            let ports = self.ports.lock();
            ports
                .iter()
                .filter(|(_, link)| matches!(link.target.status, crate::identifiers::NeighborStatus::TwoWay))
                .map(|(index, link)| LinkDescription {
                    neighbor_node_id: link.target.node_id.clone(),
                    port_index_at_origin: index,
                    weight: link.weight,
                })
                .collect()
        };
        self.lsd.with_lock(|map| {
            let next = match map.get(&self.node_id) {
                Some(current) => current.next(links),
                None => Lsa::never_advertised(self.node_id.clone()).next(links),
            };
            map.insert(self.node_id.clone(), next);
        });
    }

    /// Marks the self-LSA as shut down, bumping its sequence number, under
    /// a single critical section (a compound read-bump-write).
    pub fn shutdown_self_lsa(&self) {
        self.lsd.with_lock(|map| {
            let next = match map.get(&self.node_id) {
                Some(current) => current.shutdown(),
                None => Lsa::never_advertised(self.node_id.clone()).shutdown(),
            };
            map.insert(self.node_id.clone(), next);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{NeighborDescriptor, NeighborStatus};
    use crate::ports::Link;

    fn test_node() -> Node {
        Node::new(NodeId::new("self"), ProcessEndpoint::new("127.0.0.1", 20000))
    }

    #[test]
    fn self_lsa_matches_two_way_ports() {
        let node = test_node();
        {
            let mut ports = node.ports.lock();
            let origin = NeighborDescriptor::this_node(node.endpoint.clone(), node.node_id.clone());
            let mut target = NeighborDescriptor::new(ProcessEndpoint::new("127.0.0.1", 20001), NodeId::new("peer"), 5);
            target.status = NeighborStatus::TwoWay;
            let mut link = Link::new(origin, target, 5);
            link.origin.status = NeighborStatus::TwoWay;
            ports.attach(0, link);
        }
        node.regenerate_self_lsa();
        let lsa = node.lsd.get(&node.node_id).unwrap();
        assert_eq!(lsa.links.len(), 1);
        assert_eq!(lsa.links[0].neighbor_node_id, NodeId::new("peer"));
        assert_eq!(lsa.links[0].weight, 5);
    }

    #[test]
    fn shutdown_bumps_sequence_and_sets_flag() {
        let node = test_node();
        node.regenerate_self_lsa();
        let before = node.lsd.get(&node.node_id).unwrap();
        node.shutdown_self_lsa();
        let after = node.lsd.get(&node.node_id).unwrap();
        assert!(after.has_shutdown);
        assert!(after.seq_number > before.seq_number);
    }
}
