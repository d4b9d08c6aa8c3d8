//! CLI configuration, parsed with `clap`'s derive API.

use clap::Parser;

use crate::identifiers::{MAX_PORT, MIN_PORT};

#[derive(Parser, Debug)]
#[command(name = "sospf", about = "a simulated link-state routing node")]
pub struct Config {
    /// This node's simulated id, e.g. "1.1.1.1".
    pub node_id: String,

    /// Host the listening socket binds to.
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Lowest port considered when self-assigning the listening socket.
    #[arg(long, default_value_t = MIN_PORT)]
    pub min_port: u16,

    /// Highest port considered when self-assigning the listening socket.
    #[arg(long, default_value_t = MAX_PORT)]
    pub max_port: u16,

    /// Enables the optional heartbeat liveness loop.
    #[arg(long)]
    pub heartbeat: bool,
}
