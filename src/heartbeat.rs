//! Optional liveness detection, enabled by `--heartbeat`. Every 5 seconds
//! each TWO_WAY neighbor is pinged; after 5 consecutive failures to get a
//! reply it is declared dead, detached, and its last-known LSA tombstoned.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::error::{Error, ErrorKind, Result};
use crate::flood::flood_to_neighbors;
use crate::identifiers::{NeighborStatus, NodeId, ProcessEndpoint};
use crate::node::Node;
use crate::wire::{PacketKind, SospfPacket};

const INTERVAL: Duration = Duration::from_secs(5);
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Runs forever. Intended to be spawned as its own task when `--heartbeat`
/// is set; has no effect on nodes that never spawn it, since the request
/// handler's HEARTBEAT echo is always present regardless.
pub async fn run(node: Arc<Node>) {
    let mut failures: HashMap<NodeId, u32> = HashMap::new();
    loop {
        tokio::time::sleep(INTERVAL).await;

        let targets: Vec<(usize, NodeId, ProcessEndpoint)> = {
            let ports = node.ports.lock();
            ports
                .iter()
                .filter(|(_, link)| link.target.status == NeighborStatus::TwoWay)
                .map(|(index, link)| (index, link.target.node_id.clone(), link.target.endpoint.clone()))
                .collect()
        };

        for (index, neighbor_id, endpoint) in targets {
            match ping(&node, &endpoint, &neighbor_id).await {
                Ok(()) => {
                    failures.remove(&neighbor_id);
                }
                Err(e) => {
                    let count = failures.entry(neighbor_id.clone()).or_insert(0);
                    *count += 1;
                    tracing::debug!(%neighbor_id, failures = *count, error = %e, "heartbeat failed");
                    if *count >= MAX_CONSECUTIVE_FAILURES {
                        mark_neighbor_dead(&node, index, &neighbor_id).await;
                        failures.remove(&neighbor_id);
                    }
                }
            }
        }
    }
}

async fn ping(node: &Node, endpoint: &ProcessEndpoint, neighbor_id: &NodeId) -> Result<()> {
    let mut stream = TcpStream::connect(endpoint.socket_addr()).await?;
    let packet = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        neighbor_id.clone(),
        PacketKind::Heartbeat,
    );
    packet.write_to(&mut stream).await?;
    let reply = SospfPacket::read_from(&mut stream).await?;
    match reply.kind {
        PacketKind::Heartbeat => Ok(()),
        other => Err(Error::new(ErrorKind::ProtocolViolation, format!("unexpected heartbeat reply {other:?}"))),
    }
}

async fn mark_neighbor_dead(node: &Arc<Node>, index: usize, neighbor_id: &NodeId) {
    node.ports.lock().detach(index);
    node.lsd.with_lock(|map| {
        if let Some(lsa) = map.get(neighbor_id).cloned() {
            map.insert(neighbor_id.clone(), lsa.shutdown());
        }
    });
    node.regenerate_self_lsa();
    tracing::warn!(%neighbor_id, "heartbeat exhausted, marking neighbor shut down");
    flood_to_neighbors(node.clone(), None).await;
}
