//! The server loop: binds a listening socket by scanning upward
//! from `MIN_PORT`, then spawns one handler task per accepted connection.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::error::{Error, ErrorKind, Result};
use crate::handler::handle_connection;
use crate::identifiers::{MAX_PORT, MIN_PORT};
use crate::node::Node;

/// Binds the first available port in `min_port..=max_port` on `host` and
/// returns the bound listener together with the port it landed on.
pub async fn bind(host: &str, min_port: u16, max_port: u16) -> Result<(TcpListener, u16)> {
    for port in min_port..=max_port {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(_) => continue,
        }
    }
    Err(Error::new(
        ErrorKind::Io,
        format!("unable to bind any port in {min_port}..={max_port} on {host}"),
    ))
}

/// Runs the accept loop forever, spawning an independent handler task for
/// each accepted connection. Does not itself track handler lifetimes; each
/// spawned task runs and completes on its own.
pub async fn serve(node: Arc<Node>, listener: TcpListener) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        tracing::debug!(%peer_addr, "accepted connection");
        tokio::spawn(handle_connection(node.clone(), stream));
    }
}

#[allow(dead_code)]
fn default_port_range() -> (u16, u16) {
    (MIN_PORT, MAX_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{NodeId, ProcessEndpoint};

    #[tokio::test]
    async fn bind_finds_first_free_port_in_range() {
        let (listener, port) = bind("127.0.0.1", 20100, 20110).await.unwrap();
        assert!((20100..=20110).contains(&port));
        drop(listener);
    }

    #[tokio::test]
    async fn serve_accepts_and_dispatches_without_blocking_the_loop() {
        let node = Arc::new(Node::new(NodeId::new("server"), ProcessEndpoint::new("127.0.0.1", 20200)));
        let (listener, port) = bind("127.0.0.1", 20200, 20210).await.unwrap();
        assert_eq!(port, node.endpoint.port);
        tokio::spawn(serve(node, listener));

        // Connecting and dropping without sending anything should not wedge
        // the accept loop: a second connection attempt must still succeed.
        let _first = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        drop(_first);
        let second = tokio::net::TcpStream::connect(("127.0.0.1", port)).await;
        assert!(second.is_ok());
    }
}
