//! Inline LSD synchronization over an already-open connection, used by
//! both the handshake and disconnect flows. The asymmetric
//! ordering — one side always waits first — is the only cross-connection
//! ordering assumption this protocol makes.

use tokio::net::TcpStream;

use crate::error::{Error, ErrorKind, Result};
use crate::identifiers::NodeId;
use crate::ingest::ingest;
use crate::node::Node;
use crate::wire::{PacketKind, SospfPacket};

/// Server role: wait for the peer's LSAUPDATE first, apply it, rewrite the
/// self-LSA, then send this node's own LSAUPDATE.
pub async fn sync_as_server(node: &Node, stream: &mut TcpStream, peer_id: &NodeId) -> Result<()> {
    let incoming = SospfPacket::read_from(stream).await?;
    let lsas = expect_lsa_update(incoming)?;
    ingest(node, peer_id, lsas);
    node.regenerate_self_lsa();
    send_lsa_update(node, stream, peer_id).await
}

/// Client role: send this node's LSAUPDATE first, then wait for and apply
/// the peer's, treating it as authoritative.
pub async fn sync_as_client(node: &Node, stream: &mut TcpStream, peer_id: &NodeId) -> Result<()> {
    send_lsa_update(node, stream, peer_id).await?;
    let incoming = SospfPacket::read_from(stream).await?;
    let lsas = expect_lsa_update(incoming)?;
    ingest(node, peer_id, lsas);
    Ok(())
}

fn expect_lsa_update(packet: SospfPacket) -> Result<Vec<crate::lsa::Lsa>> {
    match packet.kind {
        PacketKind::LsaUpdate { lsas } => Ok(lsas),
        other => Err(Error::new(
            ErrorKind::ProtocolViolation,
            format!("expected LSAUPDATE during synchronization, got {other:?}"),
        )),
    }
}

async fn send_lsa_update(node: &Node, stream: &mut TcpStream, peer_id: &NodeId) -> Result<()> {
    let packet = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        peer_id.clone(),
        PacketKind::LsaUpdate {
            lsas: node.lsd.snapshot_values(),
        },
    );
    packet.write_to(stream).await
}
