//! Outbound LSA flooding: a fire-and-forget broadcast of the local LSD
//! snapshot to every TWO_WAY neighbor other than an excluded one.

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::Result;
use crate::identifiers::{NeighborStatus, NodeId, ProcessEndpoint};
use crate::node::Node;
use crate::wire::{PacketKind, SospfPacket};

/// Opens a fresh outbound connection to each TWO_WAY neighbor other than
/// `exclude` (and whose last-seen LSA is not shut down) and sends a single
/// LSAUPDATE carrying the current LSD snapshot. Each send runs in its own
/// task so a single unreachable neighbor cannot stall or abort the rest of
/// the broadcast.
pub async fn flood_to_neighbors(node: Arc<Node>, exclude: Option<NodeId>) {
    let targets: Vec<(ProcessEndpoint, NodeId)> = {
        let ports = node.ports.lock();
        ports
            .iter()
            .filter(|(_, link)| matches!(link.target.status, NeighborStatus::TwoWay))
            .filter(|(_, link)| exclude.as_ref() != Some(&link.target.node_id))
            .filter(|(_, link)| {
                node.lsd
                    .get(&link.target.node_id)
                    .map(|lsa| !lsa.has_shutdown)
                    .unwrap_or(true)
            })
            .map(|(_, link)| (link.target.endpoint.clone(), link.target.node_id.clone()))
            .collect()
    };

    for (endpoint, neighbor_id) in targets {
        let node = node.clone();
        tokio::spawn(async move {
            if let Err(e) = send_lsa_update(&node, &endpoint, &neighbor_id).await {
                tracing::warn!(%neighbor_id, error = %e, "flood to neighbor failed");
            }
        });
    }
}

async fn send_lsa_update(node: &Node, endpoint: &ProcessEndpoint, neighbor_id: &NodeId) -> Result<()> {
    let mut stream = TcpStream::connect(endpoint.socket_addr()).await?;
    let packet = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        neighbor_id.clone(),
        PacketKind::LsaUpdate {
            lsas: node.lsd.snapshot_values(),
        },
    );
    packet.write_to(&mut stream).await?;
    Ok(())
}
