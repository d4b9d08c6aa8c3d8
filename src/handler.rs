//! The per-connection request handler: serves exactly one protocol
//! request on its connection, then closes.

use std::sync::Arc;

use tokio::net::TcpStream;

use crate::error::{Error, ErrorKind, Result};
use crate::flood::flood_to_neighbors;
use crate::identifiers::{NeighborDescriptor, NeighborStatus, NodeId, ProcessEndpoint};
use crate::ingest::ingest;
use crate::lsa::Lsa;
use crate::node::Node;
use crate::ports::{Link, SlotResult};
use crate::sync::sync_as_server;
use crate::wire::{PacketKind, SospfPacket};

/// Entry point spawned by the server loop for each accepted connection.
/// Any failure is logged here; it never propagates to the accept loop.
pub async fn handle_connection(node: Arc<Node>, mut stream: TcpStream) {
    if let Err(e) = dispatch(&node, &mut stream).await {
        tracing::error!(error = %e, "request handler failed");
    }
}

async fn dispatch(node: &Arc<Node>, stream: &mut TcpStream) -> Result<()> {
    let packet = SospfPacket::read_from(stream).await?;
    let sender_id = packet.src_node_id;
    let sender_host = packet.src_process_ip;
    let sender_port = packet.src_process_port;

    match packet.kind {
        PacketKind::Hello { weight } => {
            handle_hello_conversation(node, stream, sender_id, sender_host, sender_port, weight, false).await
        }
        PacketKind::Connect { weight } => {
            handle_hello_conversation(node, stream, sender_id, sender_host, sender_port, weight, true).await
        }
        PacketKind::LsaUpdate { lsas } => handle_lsa_update(node, sender_id, lsas).await,
        PacketKind::Disconnect => handle_disconnect(node, stream, sender_id).await,
        PacketKind::Heartbeat => handle_heartbeat(node, stream, sender_id).await,
        PacketKind::NoPortsAvailable => {
            Err(Error::new(ErrorKind::ProtocolViolation, "unexpected NoPortsAvailable from a peer"))
        }
    }
}

/// Server side of the three-message HELLO/CONNECT exchange.
#[allow(clippy::too_many_arguments)]
async fn handle_hello_conversation(
    node: &Arc<Node>,
    stream: &mut TcpStream,
    client_id: NodeId,
    client_host: String,
    client_port: u16,
    weight: i32,
    is_connect: bool,
) -> Result<()> {
    let index = {
        let mut ports = node.ports.lock();
        match ports.find_free_slot(&client_id) {
            SlotResult::Full => {
                drop(ports);
                let reply = SospfPacket::new(
                    node.endpoint.host.clone(),
                    node.endpoint.port,
                    node.node_id.clone(),
                    client_id.clone(),
                    PacketKind::NoPortsAvailable,
                );
                reply.write_to(stream).await?;
                return Ok(());
            }
            SlotResult::Duplicate(index) => index,
            SlotResult::Free(index) => {
                let origin = NeighborDescriptor::this_node(node.endpoint.clone(), node.node_id.clone());
                let target = NeighborDescriptor::new(ProcessEndpoint::new(client_host, client_port), client_id.clone(), weight);
                ports.attach(index, Link::new(origin, target, weight));
                index
            }
        }
    };

    node.ports.lock().set_status(index, NeighborStatus::Init);
    tracing::info!(%client_id, "received HELLO from {client_id}");
    tracing::info!(%client_id, "set {client_id} state to INIT");

    let reply_kind = if is_connect {
        PacketKind::Connect { weight }
    } else {
        PacketKind::Hello { weight }
    };
    let reply = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        client_id.clone(),
        reply_kind,
    );
    reply.write_to(stream).await?;

    let step3 = SospfPacket::read_from(stream).await?;
    match step3.kind {
        PacketKind::Hello { .. } | PacketKind::Connect { .. } => {}
        other => {
            return Err(Error::new(
                ErrorKind::ProtocolViolation,
                format!("expected step-3 HELLO/CONNECT echo, got {other:?}"),
            ))
        }
    }

    node.ports.lock().set_status(index, NeighborStatus::TwoWay);
    tracing::info!(%client_id, "set {client_id} state to TWO_WAY");
    node.regenerate_self_lsa();

    sync_as_server(node, stream, &client_id).await?;
    flood_to_neighbors(node.clone(), Some(client_id)).await;
    Ok(())
}

async fn handle_lsa_update(node: &Arc<Node>, sender_id: NodeId, lsas: Vec<Lsa>) -> Result<()> {
    let outcome = ingest(node, &sender_id, lsas);
    if outcome.first_contact {
        flood_to_neighbors(node.clone(), None).await;
    } else if outcome.changed {
        flood_to_neighbors(node.clone(), Some(sender_id)).await;
    }
    Ok(())
}

async fn handle_disconnect(node: &Arc<Node>, stream: &mut TcpStream, sender_id: NodeId) -> Result<()> {
    let index = node.ports.lock().find_attached_slot(&sender_id);
    let Some(index) = index else {
        return Ok(());
    };

    let ack = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        sender_id.clone(),
        PacketKind::Disconnect,
    );
    ack.write_to(stream).await?;

    node.ports.lock().detach(index);
    node.regenerate_self_lsa();

    sync_as_server(node, stream, &sender_id).await?;
    flood_to_neighbors(node.clone(), Some(sender_id)).await;
    Ok(())
}

async fn handle_heartbeat(node: &Arc<Node>, stream: &mut TcpStream, sender_id: NodeId) -> Result<()> {
    let attached = node.ports.lock().find_attached_slot(&sender_id).is_some();
    if !attached {
        return Ok(());
    }
    let reply = SospfPacket::new(
        node.endpoint.host.clone(),
        node.endpoint.port,
        node.node_id.clone(),
        sender_id,
        PacketKind::Heartbeat,
    );
    reply.write_to(stream).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listening_node(node_id: &str) -> (Arc<Node>, std::net::SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let node = Arc::new(Node::new(NodeId::new(node_id), ProcessEndpoint::new("127.0.0.1", addr.port())));
        let accept_node = node.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                tokio::spawn(handle_connection(accept_node.clone(), stream));
            }
        });
        (node, addr)
    }

    #[tokio::test]
    async fn hello_handshake_reaches_two_way_and_floods_self_lsa() {
        let (server, server_addr) = listening_node("server").await;
        let client = Node::new(NodeId::new("client"), ProcessEndpoint::new("127.0.0.1", 30000));

        let mut conn = TcpStream::connect(server_addr).await.unwrap();
        let hello = SospfPacket::new(
            client.endpoint.host.clone(),
            client.endpoint.port,
            client.node_id.clone(),
            server.node_id.clone(),
            PacketKind::Hello { weight: 7 },
        );
        hello.write_to(&mut conn).await.unwrap();

        let step2 = SospfPacket::read_from(&mut conn).await.unwrap();
        assert!(matches!(step2.kind, PacketKind::Hello { weight: 7 }));

        let echo = SospfPacket::new(
            client.endpoint.host.clone(),
            client.endpoint.port,
            client.node_id.clone(),
            server.node_id.clone(),
            PacketKind::Hello { weight: 7 },
        );
        echo.write_to(&mut conn).await.unwrap();

        // client side of LSD sync: send first, then wait for server's.
        let client_update = SospfPacket::new(
            client.endpoint.host.clone(),
            client.endpoint.port,
            client.node_id.clone(),
            server.node_id.clone(),
            PacketKind::LsaUpdate { lsas: vec![] },
        );
        client_update.write_to(&mut conn).await.unwrap();
        let _server_update = SospfPacket::read_from(&mut conn).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let ports = server.ports.lock();
        let index = ports.find_attached_slot(&NodeId::new("client")).unwrap();
        assert_eq!(ports.get(index).unwrap().target.status, NeighborStatus::TwoWay);
        drop(ports);

        let self_lsa = server.lsd.get(&server.node_id).unwrap();
        assert_eq!(self_lsa.links.len(), 1);
        assert_eq!(self_lsa.links[0].neighbor_node_id, NodeId::new("client"));
    }

    #[tokio::test]
    async fn full_ports_table_replies_no_ports_available() {
        let (server, server_addr) = listening_node("server").await;
        {
            let mut ports = server.ports.lock();
            for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
                let origin = NeighborDescriptor::this_node(server.endpoint.clone(), server.node_id.clone());
                let target = NeighborDescriptor::new(ProcessEndpoint::new("127.0.0.1", 30001 + i as u16), NodeId::new(*id), 1);
                ports.attach(i, Link::new(origin, target, 1));
            }
        }

        let mut conn = TcpStream::connect(server_addr).await.unwrap();
        let hello = SospfPacket::new(
            "127.0.0.1",
            30010,
            NodeId::new("fifth"),
            server.node_id.clone(),
            PacketKind::Hello { weight: 1 },
        );
        hello.write_to(&mut conn).await.unwrap();

        let reply = SospfPacket::read_from(&mut conn).await.unwrap();
        assert!(matches!(reply.kind, PacketKind::NoPortsAvailable));
    }
}
