//! The ports table: a fixed-size array of neighbor slots.

use crate::error::{Error, ErrorKind, Result};
use crate::identifiers::{NeighborDescriptor, NeighborStatus, NodeId, ProcessEndpoint, MAX_PORT, MIN_PORT};

/// Capacity of the ports table. Protocol-visible: peers beyond this count
/// are rejected with `NoPortsAvailable`.
pub const NUM_PORTS: usize = 4;

/// A bound slot in the ports table.
///
/// Invariants upheld by construction: `origin` is always this node's own
/// descriptor, and `target.node_id` never equals the origin's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub origin: NeighborDescriptor,
    pub target: NeighborDescriptor,
    pub weight: i32,
}

impl Link {
    pub fn new(origin: NeighborDescriptor, target: NeighborDescriptor, weight: i32) -> Self {
        Link { origin, target, weight }
    }
}

/// Outcome of looking for a slot to hold a given neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResult {
    Free(usize),
    Duplicate(usize),
    Full,
}

/// Fixed-size array of exactly `NUM_PORTS` slots, each either empty or
/// holding a [`Link`].
#[derive(Debug, Default)]
pub struct PortsTable {
    slots: [Option<Link>; NUM_PORTS],
}

impl PortsTable {
    pub fn new() -> Self {
        PortsTable {
            slots: Default::default(),
        }
    }

    pub fn find_free_slot(&self, remote_node_id: &NodeId) -> SlotResult {
        if let Some(index) = self.find_attached_slot(remote_node_id) {
            return SlotResult::Duplicate(index);
        }
        match self.slots.iter().position(|slot| slot.is_none()) {
            Some(index) => SlotResult::Free(index),
            None => SlotResult::Full,
        }
    }

    pub fn find_attached_slot(&self, remote_node_id: &NodeId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(link) if &link.target.node_id == remote_node_id))
    }

    pub fn get(&self, index: usize) -> Option<&Link> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Link> {
        self.slots.get_mut(index).and_then(|slot| slot.as_mut())
    }

    pub fn attach(&mut self, index: usize, link: Link) {
        self.slots[index] = Some(link);
    }

    pub fn detach(&mut self, index: usize) -> Option<Link> {
        self.slots[index].take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Link)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|link| (i, link)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Link)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|link| (i, link)))
    }

    pub fn set_status(&mut self, index: usize, status: NeighborStatus) {
        if let Some(link) = self.get_mut(index) {
            link.origin.status = status;
            link.target.status = status;
        }
    }
}

/// Validates the arguments to `attach`/`connect` before touching the table.
pub fn validate_attachment(
    remote_host: &str,
    remote_port: u16,
    remote_node_id: &NodeId,
    weight: i32,
    self_node_id: &NodeId,
    self_port: u16,
) -> Result<()> {
    if remote_host.is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument, "remote process address must not be empty"));
    }
    if remote_node_id.as_str().is_empty() {
        return Err(Error::new(ErrorKind::InvalidArgument, "remote node id must not be empty"));
    }
    if remote_port < MIN_PORT || remote_port > MAX_PORT {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("remote port {remote_port} is outside the permitted range {MIN_PORT}..={MAX_PORT}"),
        ));
    }
    if weight <= 0 {
        return Err(Error::new(ErrorKind::InvalidArgument, "link weight must be positive"));
    }
    if remote_node_id == self_node_id {
        return Err(Error::new(ErrorKind::InvalidArgument, "cannot attach to self"));
    }
    if remote_port == self_port {
        return Err(Error::new(ErrorKind::InvalidArgument, "remote process port must differ from self port"));
    }
    Ok(())
}

/// Convenience constructor used by both `attach` and the server-side
/// handshake to build a `ProcessEndpoint` from loose CLI/wire arguments.
pub fn endpoint(host: impl Into<String>, port: u16) -> ProcessEndpoint {
    ProcessEndpoint::new(host, port)
}
