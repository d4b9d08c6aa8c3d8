//! The wire envelope: one fixed message shape for every protocol type,
//! and the length-prefixed framing used to put it on a stream.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, ErrorKind, Result};
use crate::identifiers::NodeId;
use crate::lsa::Lsa;

/// Sentinel used for the transmission-weight field on packet types where it
/// is not meaningful.
pub const IRRELEVANT_TRANSMISSION_WEIGHT: i32 = -1;

/// The largest payload this implementation is willing to read from a peer.
/// Guards against a malformed/hostile length prefix causing an unbounded
/// allocation.
const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// `type` of a [`SospfPacket`], expressed as a Rust enum so that the fields
/// relevant to each variant are the only ones representable — there is no
/// flat envelope with sentinel fields to validate at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PacketKind {
    Hello { weight: i32 },
    Connect { weight: i32 },
    LsaUpdate { lsas: Vec<Lsa> },
    Disconnect,
    Heartbeat,
    NoPortsAvailable,
}

/// The single wire envelope carrying every protocol interaction.
///
/// `src_process_ip`/`src_process_port`/`src_node_id` identify the sender;
/// `dst_node_id` the intended recipient, for sanity-checking on receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SospfPacket {
    pub src_process_ip: String,
    pub src_process_port: u16,
    pub src_node_id: NodeId,
    pub dst_node_id: NodeId,
    pub kind: PacketKind,
}

impl SospfPacket {
    pub fn new(
        src_process_ip: impl Into<String>,
        src_process_port: u16,
        src_node_id: NodeId,
        dst_node_id: NodeId,
        kind: PacketKind,
    ) -> Self {
        SospfPacket {
            src_process_ip: src_process_ip.into(),
            src_process_port,
            src_node_id,
            dst_node_id,
            kind,
        }
    }

    /// Serializes `self` as a 4-byte little-endian length prefix followed
    /// by a `bincode`-encoded payload, and writes it to `stream`.
    pub async fn write_to(&self, stream: &mut TcpStream) -> Result<()> {
        let payload = bincode::serialize(self)?;
        let len = payload.len() as u32;
        stream.write_all(&len.to_le_bytes()).await?;
        stream.write_all(&payload).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads a single length-prefixed, `bincode`-encoded envelope from
    /// `stream`.
    pub async fn read_from(stream: &mut TcpStream) -> Result<Self> {
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await?;
        let len = u32::from_le_bytes(len_buf);
        if len > MAX_PAYLOAD_LEN {
            return Err(Error::new(
                ErrorKind::ProtocolViolation,
                format!("packet length {len} exceeds the {MAX_PAYLOAD_LEN}-byte limit"),
            ));
        }
        let mut buf = vec![0u8; len as usize];
        stream.read_exact(&mut buf).await?;
        let packet = bincode::deserialize(&buf)?;
        Ok(packet)
    }
}
