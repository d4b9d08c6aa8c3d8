//! The ingest algorithm shared by both flooding patterns: applying an
//! incoming LSA array to the local LSD and propagating any resulting
//! link-weight change back into the ports table.

use crate::identifiers::NodeId;
use crate::lsa::Lsa;
use crate::node::Node;

/// Outcome of ingesting one LSAUPDATE's worth of LSAs from `sender_id`.
pub struct IngestOutcome {
    /// Whether any LSA in the array replaced a staler stored one, or a
    /// local port weight was updated as a result.
    pub changed: bool,
    /// Whether this is the first LSAUPDATE ever ingested from `sender_id`.
    pub first_contact: bool,
}

/// Applies `lsas` to `node`'s LSD, then — if `sender_id` is a directly
/// attached neighbor — checks whether the neighbor's freshly stored LSA
/// advertises a link back to this node with a different weight than the
/// local port records, updating the port (and regenerating the self-LSA)
/// if so.
pub fn ingest(node: &Node, sender_id: &NodeId, lsas: Vec<Lsa>) -> IngestOutcome {
    let mut changed = false;

    for lsa in lsas {
        let origin = lsa.origin_node_id.clone();
        let replaced = node.lsd.with_lock(|map| {
            let fresher = Lsa::is_fresher(map.get(&origin), &lsa);
            if fresher {
                map.insert(origin.clone(), lsa);
            }
            fresher
        });
        if replaced {
            changed = true;
        }
    }

    let is_attached = node.ports.lock().find_attached_slot(sender_id).is_some();
    if is_attached {
        if let Some(sender_lsa) = node.lsd.get(sender_id) {
            let back_link = sender_lsa.links.iter().find(|l| &l.neighbor_node_id == &node.node_id);
            if let Some(link_desc) = back_link {
                let weight_changed = {
                    let mut ports = node.ports.lock();
                    match ports.find_attached_slot(sender_id) {
                        Some(index) => {
                            let link = ports.get_mut(index).expect("index came from find_attached_slot");
                            if link.weight != link_desc.weight {
                                link.weight = link_desc.weight;
                                true
                            } else {
                                false
                            }
                        }
                        None => false,
                    }
                };
                if weight_changed {
                    node.regenerate_self_lsa();
                    changed = true;
                }
            }
        }
    }

    let first_contact = node.mark_contacted(sender_id);
    IngestOutcome { changed, first_contact }
}
