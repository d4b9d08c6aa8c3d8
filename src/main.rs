use std::sync::Arc;

use clap::Parser;

use sospf::config::Config;
use sospf::identifiers::{NodeId, ProcessEndpoint};
use sospf::node::Node;
use sospf::{heartbeat, repl, server};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (listener, port) = match server::bind(&config.bind, config.min_port, config.max_port).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "unable to bind any port in the permitted range");
            std::process::exit(1);
        }
    };

    let node_id = NodeId::new(config.node_id);
    let endpoint = ProcessEndpoint::new(config.bind, port);
    tracing::info!(%node_id, %endpoint, "node listening");
    let node = Arc::new(Node::new(node_id, endpoint));

    tokio::spawn(server::serve(node.clone(), listener));

    if config.heartbeat {
        tokio::spawn(heartbeat::run(node.clone()));
    }

    repl::run(node).await;
}
