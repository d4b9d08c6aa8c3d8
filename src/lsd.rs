//! The Link-State Database: each node's mapping from peer id to the latest
//! LSA seen for that peer, plus the shortest-path query over it.

use std::collections::{BinaryHeap, HashMap};

use parking_lot::Mutex;

use crate::identifiers::NodeId;
use crate::lsa::Lsa;

/// Per-node latest-LSA store, serialized under a single mutex.
///
/// `get`, `put`, and `snapshot_values` are each atomic; callers that need a
/// read-modify-write (e.g. bumping the self-LSA's sequence number) must do
/// so within a single critical section via [`LinkStateDatabase::with_lock`].
#[derive(Default)]
pub struct LinkStateDatabase {
    inner: Mutex<HashMap<NodeId, Lsa>>,
}

impl LinkStateDatabase {
    pub fn new() -> Self {
        LinkStateDatabase::default()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<Lsa> {
        self.inner.lock().get(node_id).cloned()
    }

    /// Unconditional overwrite.
    pub fn put(&self, node_id: NodeId, lsa: Lsa) {
        self.inner.lock().insert(node_id, lsa);
    }

    /// Ordered by origin id, for deterministic LSAUPDATE payloads.
    pub fn snapshot_values(&self) -> Vec<Lsa> {
        let guard = self.inner.lock();
        let mut values: Vec<Lsa> = guard.values().cloned().collect();
        values.sort_by(|a, b| a.origin_node_id.cmp(&b.origin_node_id));
        values
    }

    /// Runs `f` with exclusive access to the underlying map, for compound
    /// operations (such as shutdown's read-bump-write) that must be atomic
    /// with respect to other writers.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut HashMap<NodeId, Lsa>) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Classical Dijkstra over the directed weighted graph induced by the
    /// LSD. Returns `None` when `destination` is unreachable from `origin`.
    /// LSAs with `has_shutdown = true` are excluded as origins and as edge
    /// endpoints. Ties are broken by preferring the lexicographically
    /// smaller `NodeId`, both on the frontier pop and on the predecessor
    /// chosen for a given node, so the result is deterministic for a given
    /// LSD snapshot.
    pub fn shortest_path(&self, origin: &NodeId, destination: &NodeId) -> Option<String> {
        if origin == destination {
            return Some(origin.to_string());
        }

        let lsas = self.snapshot_values();
        let mut graph: HashMap<&NodeId, Vec<(&NodeId, i32)>> = HashMap::new();
        for lsa in lsas.iter().filter(|l| !l.has_shutdown) {
            let edges = graph.entry(&lsa.origin_node_id).or_default();
            for link in &lsa.links {
                edges.push((&link.neighbor_node_id, link.weight));
            }
        }

        #[derive(Eq, PartialEq)]
        struct Frontier<'a> {
            cost: i32,
            node: &'a NodeId,
        }
        impl<'a> Ord for Frontier<'a> {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                // BinaryHeap is a max-heap; invert cost to get a min-heap,
                // then break ties on the smaller node id.
                other.cost.cmp(&self.cost).then_with(|| other.node.cmp(self.node))
            }
        }
        impl<'a> PartialOrd for Frontier<'a> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        let mut dist: HashMap<&NodeId, i32> = HashMap::new();
        let mut prev: HashMap<&NodeId, &NodeId> = HashMap::new();
        let mut visited: std::collections::HashSet<&NodeId> = std::collections::HashSet::new();
        let mut heap = BinaryHeap::new();

        dist.insert(origin, 0);
        heap.push(Frontier { cost: 0, node: origin });

        while let Some(Frontier { cost, node }) = heap.pop() {
            if !visited.insert(node) {
                continue;
            }
            if node == destination {
                break;
            }
            let Some(edges) = graph.get(node) else { continue };
            for &(neighbor, weight) in edges {
                if visited.contains(neighbor) {
                    continue;
                }
                let candidate = cost + weight;
                let better = match (dist.get(neighbor), prev.get(neighbor)) {
                    (None, _) => true,
                    (Some(&best), existing_prev) => {
                        candidate < best || (candidate == best && Some(&node) < existing_prev)
                    }
                };
                if better {
                    dist.insert(neighbor, candidate);
                    prev.insert(neighbor, node);
                    heap.push(Frontier { cost: candidate, node: neighbor });
                }
            }
        }

        if !dist.contains_key(destination) {
            return None;
        }

        // reconstruct path origin -> destination
        let mut path = vec![destination];
        let mut cur = destination;
        while cur != origin {
            let p = prev.get(cur)?;
            path.push(p);
            cur = p;
        }
        path.reverse();

        let mut out = String::new();
        out.push_str(path[0].as_str());
        for window in path.windows(2) {
            let (from, to) = (window[0], window[1]);
            let weight = graph[from].iter().find(|(n, _)| *n == to).map(|(_, w)| *w).unwrap_or(0);
            out.push_str(&format!(" ->({}) {}", weight, to));
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsa::LinkDescription;

    fn lsa(id: &str, links: Vec<(&str, i32)>) -> Lsa {
        Lsa {
            origin_node_id: NodeId::new(id),
            seq_number: 0,
            has_shutdown: false,
            links: links
                .into_iter()
                .enumerate()
                .map(|(i, (neighbor, weight))| LinkDescription {
                    neighbor_node_id: NodeId::new(neighbor),
                    port_index_at_origin: i,
                    weight,
                })
                .collect(),
        }
    }

    #[test]
    fn self_path_is_trivial() {
        let lsd = LinkStateDatabase::new();
        let a = NodeId::new("a");
        assert_eq!(lsd.shortest_path(&a, &a), Some("a".to_string()));
    }

    #[test]
    fn unreachable_destination_is_none() {
        let lsd = LinkStateDatabase::new();
        lsd.put(NodeId::new("a"), lsa("a", vec![]));
        assert_eq!(lsd.shortest_path(&NodeId::new("a"), &NodeId::new("z")), None);
    }

    #[test]
    fn two_node_direct_link() {
        let lsd = LinkStateDatabase::new();
        lsd.put(NodeId::new("1.1.1.1"), lsa("1.1.1.1", vec![("2.2.2.2", 7)]));
        lsd.put(NodeId::new("2.2.2.2"), lsa("2.2.2.2", vec![("1.1.1.1", 7)]));
        assert_eq!(
            lsd.shortest_path(&NodeId::new("1.1.1.1"), &NodeId::new("2.2.2.2")),
            Some("1.1.1.1 ->(7) 2.2.2.2".to_string())
        );
    }

    #[test]
    fn triangle_prefers_cheaper_indirect_path() {
        let lsd = LinkStateDatabase::new();
        lsd.put(NodeId::new("A"), lsa("A", vec![("B", 3), ("C", 10)]));
        lsd.put(NodeId::new("B"), lsa("B", vec![("A", 3), ("C", 1)]));
        lsd.put(NodeId::new("C"), lsa("C", vec![("A", 10), ("B", 1)]));
        assert_eq!(
            lsd.shortest_path(&NodeId::new("A"), &NodeId::new("C")),
            Some("A ->(3) B ->(1) C".to_string())
        );
    }

    #[test]
    fn shutdown_lsa_excluded_from_graph() {
        let lsd = LinkStateDatabase::new();
        lsd.put(NodeId::new("A"), lsa("A", vec![("B", 3), ("C", 10)]));
        let mut b = lsa("B", vec![("A", 3), ("C", 1)]);
        b.has_shutdown = true;
        lsd.put(NodeId::new("B"), b);
        lsd.put(NodeId::new("C"), lsa("C", vec![("A", 10), ("B", 1)]));
        assert_eq!(
            lsd.shortest_path(&NodeId::new("A"), &NodeId::new("C")),
            Some("A ->(10) C".to_string())
        );
    }
}
