//! End-to-end scenarios driving real nodes over loopback TCP.

use std::sync::Arc;

use sospf::identifiers::{NodeId, ProcessEndpoint};
use sospf::node::Node;
use sospf::{originator, server};

async fn spawn_node(id: &str) -> Arc<Node> {
    let (listener, port) = server::bind("127.0.0.1", 21000, 21999).await.unwrap();
    let node = Arc::new(Node::new(NodeId::new(id), ProcessEndpoint::new("127.0.0.1", port)));
    tokio::spawn(server::serve(node.clone(), listener));
    node
}

async fn link(a: &Arc<Node>, b: &Arc<Node>, weight: i32) {
    originator::attach(a, b.endpoint.host.clone(), b.endpoint.port, b.node_id.clone(), weight).unwrap();
    originator::start(a.clone()).await.unwrap();
}

#[tokio::test]
async fn two_node_handshake_reaches_two_way_with_correct_weight() {
    let a = spawn_node("1.1.1.1").await;
    let b = spawn_node("2.2.2.2").await;

    link(&a, &b, 7).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let path = originator::detect(&a, &b.node_id).unwrap();
    assert_eq!(path, format!("1.1.1.1 ->(7) {}", b.node_id));

    let ports = a.ports.lock();
    let index = ports.find_attached_slot(&b.node_id).unwrap();
    assert_eq!(ports.get(index).unwrap().target.status, sospf::identifiers::NeighborStatus::TwoWay);
}

#[tokio::test]
async fn triangle_prefers_cheaper_indirect_path() {
    let a = spawn_node("A").await;
    let b = spawn_node("B").await;
    let c = spawn_node("C").await;

    link(&a, &b, 3).await;
    link(&b, &c, 1).await;
    link(&a, &c, 10).await;
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    let path = originator::detect(&a, &c.node_id).unwrap();
    assert_eq!(path, "A ->(3) B ->(1) C");
}

#[tokio::test]
async fn port_exhaustion_rejects_a_fifth_attachment() {
    let center = spawn_node("center").await;
    let mut peers = Vec::new();
    for id in ["p1", "p2", "p3", "p4"] {
        let peer = spawn_node(id).await;
        link(&center, &peer, 1).await;
        peers.push(peer);
    }
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let fifth = spawn_node("p5").await;
    let res = originator::connect(center.clone(), fifth.endpoint.host.clone(), fifth.endpoint.port, fifth.node_id.clone(), 1).await;
    // center's own ports table is already full, so this is rejected locally
    // before any connection to the fifth peer is attempted.
    assert!(res.is_err());

    for peer in &peers {
        let ports = center.ports.lock();
        let index = ports.find_attached_slot(&peer.node_id).unwrap();
        assert_eq!(ports.get(index).unwrap().target.status, sospf::identifiers::NeighborStatus::TwoWay);
    }
}

#[tokio::test]
async fn disconnect_updates_shortest_path_on_the_remote_side() {
    let a = spawn_node("A2").await;
    let b = spawn_node("B2").await;
    let c = spawn_node("C2").await;

    link(&a, &b, 3).await;
    link(&b, &c, 1).await;
    link(&a, &c, 10).await;
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert_eq!(originator::detect(&a, &c.node_id).unwrap(), "A2 ->(3) B2 ->(1) C2");

    let index = {
        let ports = b.ports.lock();
        ports.find_attached_slot(&a.node_id).unwrap()
    };
    originator::disconnect(b.clone(), index, false).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    assert_eq!(originator::detect(&a, &c.node_id).unwrap(), "A2 ->(10) C2");
}

#[tokio::test]
async fn quit_propagates_shutdown_and_removes_node_from_remote_paths() {
    let a = spawn_node("Q-A").await;
    let b = spawn_node("Q-B").await;
    let c = spawn_node("Q-C").await;

    link(&a, &b, 3).await;
    link(&b, &c, 1).await;
    link(&a, &c, 10).await;
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert_eq!(originator::detect(&b, &a.node_id).unwrap(), "Q-B ->(3) Q-A");

    originator::quit(a.clone()).await;
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;

    // A's self-LSA is tombstoned and flooded to B and C over the wire, so
    // both a direct disconnect and the graph exclusion remove it as a
    // reachable destination, while B's unrelated path to C is untouched.
    assert_eq!(originator::detect(&b, &a.node_id), None);
    assert_eq!(originator::detect(&b, &c.node_id).unwrap(), "Q-B ->(1) Q-C");
}

#[tokio::test]
async fn stale_lsa_is_dropped_without_rebroadcast() {
    let a = spawn_node("stale-a").await;
    let origin = NodeId::new("stale-origin");

    let fresh = sospf::lsa::Lsa::never_advertised(origin.clone()).next(vec![]).next(vec![]);
    a.lsd.put(origin.clone(), fresh.clone());

    let outcome = sospf::ingest::ingest(&a, &origin, vec![fresh.clone()]);
    assert!(!outcome.changed);

    let stale = sospf::lsa::Lsa {
        seq_number: fresh.seq_number - 1,
        ..fresh.clone()
    };
    let outcome = sospf::ingest::ingest(&a, &origin, vec![stale]);
    assert!(!outcome.changed);
    assert_eq!(a.lsd.get(&origin).unwrap().seq_number, fresh.seq_number);
}
