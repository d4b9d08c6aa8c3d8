//! The CLI command loop: a synchronous read loop over stdin that
//! dispatches each line onto the shared tokio runtime. Unknown commands
//! and malformed arguments print an error and continue; nothing here ever
//! crashes the process.

use std::str::SplitWhitespace;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{Error, ErrorKind, Result};
use crate::identifiers::NodeId;
use crate::node::Node;
use crate::originator;

const PROMPT: &str = ">> ";

/// Runs the REPL until `quit` is issued or stdin is closed.
pub async fn run(node: Arc<Node>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{PROMPT}");
        let _ = std::io::Write::flush(&mut std::io::stdout());

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read a command line");
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !execute(&node, line).await {
            break;
        }
    }
}

/// Returns `false` when the REPL should stop (only `quit` does this).
async fn execute(node: &Arc<Node>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("");
    match command {
        "attach" => cmd_attach(node, parts),
        "start" => cmd_start(node.clone()).await,
        "connect" => cmd_connect(node.clone(), parts).await,
        "disconnect" => cmd_disconnect(node.clone(), parts).await,
        "neighbors" => cmd_neighbors(node),
        "detect" => cmd_detect(node, parts),
        "quit" => {
            originator::quit(node.clone()).await;
            return false;
        }
        other => {
            println!("unknown command: {other}");
            true
        }
    }
    true
}

fn parse_attach_args(mut args: SplitWhitespace<'_>) -> Result<(String, u16, NodeId, i32)> {
    let host = args
        .next()
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "usage: attach <procIp> <procPort> <nodeId> <weight>"))?;
    let port: u16 = args
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "invalid port"))?;
    let node_id = args.next().ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "missing node id"))?;
    let weight: i32 = args
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "invalid weight"))?;
    Ok((host.to_string(), port, NodeId::new(node_id), weight))
}

fn cmd_attach(node: &Node, args: SplitWhitespace<'_>) {
    match parse_attach_args(args).and_then(|(host, port, id, weight)| originator::attach(node, host, port, id, weight)) {
        Ok(index) => println!("attached at slot {index}"),
        Err(e) => println!("error: {e}"),
    }
}

async fn cmd_start(node: Arc<Node>) {
    match originator::start(node).await {
        Ok(()) => println!("start complete"),
        Err(e) => println!("error: {e}"),
    }
}

async fn cmd_connect(node: Arc<Node>, args: SplitWhitespace<'_>) {
    let parsed = parse_attach_args(args);
    match parsed {
        Ok((host, port, id, weight)) => match originator::connect(node, host, port, id, weight).await {
            Ok(()) => println!("connect complete"),
            Err(e) => println!("error: {e}"),
        },
        Err(e) => println!("error: {e}"),
    }
}

async fn cmd_disconnect(node: Arc<Node>, mut args: SplitWhitespace<'_>) {
    let index: Result<usize> = args
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, "usage: disconnect <portIndex>"));
    match index {
        Ok(index) => match originator::disconnect(node, index, false).await {
            Ok(()) => println!("disconnected"),
            Err(e) => println!("error: {e}"),
        },
        Err(e) => println!("error: {e}"),
    }
}

fn cmd_neighbors(node: &Node) {
    let ports = node.ports.lock();
    for (index, link) in ports.iter() {
        println!("[{index}] {} status={:?} weight={}", link.target.node_id, link.target.status, link.weight);
    }
}

fn cmd_detect(node: &Node, mut args: SplitWhitespace<'_>) {
    match args.next() {
        Some(destination) => match originator::detect(node, &NodeId::new(destination)) {
            Some(path) => println!("{path}"),
            None => println!("unreachable"),
        },
        None => println!("error: usage: detect <nodeId>"),
    }
}
