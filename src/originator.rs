//! Client-initiated flows: `attach`, `start`, `connect`,
//! `disconnect`, `quit`, plus the `detect` shortest-path query.

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::{Error, ErrorKind, Result};
use crate::flood::flood_to_neighbors;
use crate::identifiers::{NeighborDescriptor, NeighborStatus, NodeId, ProcessEndpoint};
use crate::node::Node;
use crate::ports::{validate_attachment, Link, SlotResult};
use crate::sync::sync_as_client;
use crate::wire::{PacketKind, SospfPacket};

/// Local slot install; no network I/O. Rejects a full ports table, a
/// duplicate self-attachment, or arguments failing validation.
///
/// Attaching to a neighbor that already occupies a slot reuses that slot
/// as-is rather than recreating the link: otherwise a redundant `attach`
/// would silently downgrade an established TWO_WAY neighbor back to an
/// UNKNOWN one with no network traffic and no log line. A handshake
/// (`start`/`connect`) is still free to reset status to INIT on that same
/// slot through its own, explicit path.
pub fn attach(node: &Node, host: impl Into<String>, port: u16, remote_id: NodeId, weight: i32) -> Result<usize> {
    let host = host.into();
    validate_attachment(&host, port, &remote_id, weight, &node.node_id, node.endpoint.port)?;

    let mut ports = node.ports.lock();
    match ports.find_free_slot(&remote_id) {
        SlotResult::Full => Err(Error::new(ErrorKind::PortExhausted, "no free port slot")),
        SlotResult::Duplicate(index) => Ok(index),
        SlotResult::Free(index) => {
            let origin = NeighborDescriptor::this_node(node.endpoint.clone(), node.node_id.clone());
            let target = NeighborDescriptor::new(ProcessEndpoint::new(host, port), remote_id, weight);
            ports.attach(index, Link::new(origin, target, weight));
            Ok(index)
        }
    }
}

/// Runs the client side of the HELLO handshake on every currently occupied
/// port, then marks `start` as having run (gating `connect`).
pub async fn start(node: Arc<Node>) -> Result<()> {
    let indices: Vec<usize> = node.ports.lock().iter().map(|(i, _)| i).collect();
    for index in indices {
        hello_handshake_client(&node, index, false).await?;
    }
    node.mark_start_run();
    Ok(())
}

/// `attach` followed by a CONNECT handshake. Requires a prior `start`.
pub async fn connect(node: Arc<Node>, host: impl Into<String>, port: u16, remote_id: NodeId, weight: i32) -> Result<()> {
    if !node.has_run_start() {
        return Err(Error::new(ErrorKind::InvalidArgument, "connect requires start to have run at least once"));
    }
    let index = attach(&node, host, port, remote_id, weight)?;
    hello_handshake_client(&node, index, true).await
}

/// Client side of the three-message HELLO/CONNECT exchange.
async fn hello_handshake_client(node: &Arc<Node>, index: usize, is_connect: bool) -> Result<()> {
    let (endpoint, weight, peer_id) = {
        let mut ports = node.ports.lock();
        ports.set_status(index, NeighborStatus::Init);
        let link = ports.get(index).ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "no link at that port index"))?;
        (link.target.endpoint.clone(), link.weight, link.target.node_id.clone())
    };

    let mut stream = TcpStream::connect(endpoint.socket_addr()).await?;

    let step1_kind = if is_connect {
        PacketKind::Connect { weight }
    } else {
        PacketKind::Hello { weight }
    };
    let step1 = SospfPacket::new(node.endpoint.host.clone(), node.endpoint.port, node.node_id.clone(), peer_id.clone(), step1_kind);
    step1.write_to(&mut stream).await?;

    let step2 = SospfPacket::read_from(&mut stream).await?;
    match step2.kind {
        PacketKind::Hello { .. } | PacketKind::Connect { .. } => {}
        other => {
            return Err(Error::new(
                ErrorKind::ProtocolViolation,
                format!("expected step-2 HELLO/CONNECT reply, got {other:?}"),
            ))
        }
    }

    node.ports.lock().set_status(index, NeighborStatus::TwoWay);
    tracing::info!(%peer_id, "set {peer_id} state to TWO_WAY");
    node.regenerate_self_lsa();

    let step3_kind = if is_connect {
        PacketKind::Connect { weight }
    } else {
        PacketKind::Hello { weight }
    };
    let step3 = SospfPacket::new(node.endpoint.host.clone(), node.endpoint.port, node.node_id.clone(), peer_id.clone(), step3_kind);
    step3.write_to(&mut stream).await?;

    sync_as_client(node, &mut stream, &peer_id).await?;
    flood_to_neighbors(node.clone(), Some(peer_id)).await;
    Ok(())
}

/// Disconnects the link at `index`. When `is_shutdown`, the self-LSA is
/// tombstoned (`has_shutdown = true`) rather than merely regenerated.
pub async fn disconnect(node: Arc<Node>, index: usize, is_shutdown: bool) -> Result<()> {
    let (status, peer_id, endpoint) = {
        let ports = node.ports.lock();
        let link = ports.get(index).ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "no link at that port index"))?;
        (link.target.status, link.target.node_id.clone(), link.target.endpoint.clone())
    };

    if status != NeighborStatus::TwoWay {
        node.ports.lock().detach(index);
        return Ok(());
    }

    let mut stream = TcpStream::connect(endpoint.socket_addr()).await?;
    let request = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        peer_id.clone(),
        PacketKind::Disconnect,
    );
    request.write_to(&mut stream).await?;

    let reply = SospfPacket::read_from(&mut stream).await?;
    if !matches!(reply.kind, PacketKind::Disconnect) {
        return Err(Error::new(ErrorKind::ProtocolViolation, "expected DISCONNECT acknowledgement"));
    }

    node.ports.lock().detach(index);

    if is_shutdown {
        node.shutdown_self_lsa();
    } else {
        node.regenerate_self_lsa();
    }

    sync_as_client(&node, &mut stream, &peer_id).await?;
    flood_to_neighbors(node.clone(), Some(peer_id)).await;
    Ok(())
}

/// Disconnects every TWO_WAY slot with `is_shutdown = true`. The caller
/// (the REPL) terminates the process once this returns.
pub async fn quit(node: Arc<Node>) {
    let indices: Vec<usize> = {
        let ports = node.ports.lock();
        ports
            .iter()
            .filter(|(_, link)| link.target.status == NeighborStatus::TwoWay)
            .map(|(i, _)| i)
            .collect()
    };
    for index in indices {
        if let Err(e) = disconnect(node.clone(), index, true).await {
            tracing::warn!(error = %e, "disconnect during quit failed");
        }
    }
}

/// Shortest path from this node to `destination`.
pub fn detect(node: &Node, destination: &NodeId) -> Option<String> {
    node.lsd.shortest_path(&node.node_id, destination)
}
