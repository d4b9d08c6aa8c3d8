//! A simulated link-state routing node: peering handshake, LSA flooding,
//! Link-State Database replication, and Dijkstra shortest paths over an
//! overlay of simulated routers connected by point-to-point TCP sockets.

pub mod config;
pub mod error;
pub mod flood;
pub mod handler;
pub mod heartbeat;
pub mod identifiers;
pub mod ingest;
pub mod lsa;
pub mod lsd;
pub mod node;
pub mod originator;
pub mod ports;
pub mod repl;
pub mod server;
pub mod sync;
pub mod wire;
