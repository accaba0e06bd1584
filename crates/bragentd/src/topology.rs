//! Routing topology entries pushed by the SoC
//!
//! A topology payload is a flat array of fixed-size entries, one per node.
//! Each entry carries the node address and its preferred and backup parent
//! addresses as raw 16-byte IPv6 values; an all-zero address means the slot
//! is unset.

use std::net::Ipv6Addr;

use serde::Serialize;

use crate::error::{AgentError, Result};

/// Wire size of one topology entry: three 16-byte IPv6 addresses
pub const TOPOLOGY_ENTRY_WIRE_SIZE: usize = 48;

/// One node in the routing topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopologyEntry {
    /// Node address
    pub target: Ipv6Addr,
    /// Preferred parent, `::` if none
    pub preferred: Ipv6Addr,
    /// Backup parent, `::` if none
    pub backup: Ipv6Addr,
}

impl TopologyEntry {
    pub fn to_wire(&self) -> [u8; TOPOLOGY_ENTRY_WIRE_SIZE] {
        let mut buf = [0u8; TOPOLOGY_ENTRY_WIRE_SIZE];
        buf[0..16].copy_from_slice(&self.target.octets());
        buf[16..32].copy_from_slice(&self.preferred.octets());
        buf[32..48].copy_from_slice(&self.backup.octets());
        buf
    }

    pub fn from_wire(buf: &[u8; TOPOLOGY_ENTRY_WIRE_SIZE]) -> Self {
        let octets = |range: std::ops::Range<usize>| -> [u8; 16] {
            let mut a = [0u8; 16];
            a.copy_from_slice(&buf[range]);
            a
        };
        Self {
            target: Ipv6Addr::from(octets(0..16)),
            preferred: Ipv6Addr::from(octets(16..32)),
            backup: Ipv6Addr::from(octets(32..48)),
        }
    }
}

/// Parse a topology payload into entries
///
/// The payload must be a nonzero multiple of [`TOPOLOGY_ENTRY_WIRE_SIZE`];
/// an empty push carries no information and is rejected.
pub fn parse_topology_payload(payload: &[u8]) -> Result<Vec<TopologyEntry>> {
    if payload.is_empty() {
        return Err(AgentError::InvalidPayload(
            "empty topology payload".to_string(),
        ));
    }
    if payload.len() % TOPOLOGY_ENTRY_WIRE_SIZE != 0 {
        return Err(AgentError::InvalidPayload(format!(
            "topology payload length {} is not a multiple of {}",
            payload.len(),
            TOPOLOGY_ENTRY_WIRE_SIZE
        )));
    }

    let mut entries = Vec::with_capacity(payload.len() / TOPOLOGY_ENTRY_WIRE_SIZE);
    for chunk in payload.chunks_exact(TOPOLOGY_ENTRY_WIRE_SIZE) {
        let mut raw = [0u8; TOPOLOGY_ENTRY_WIRE_SIZE];
        raw.copy_from_slice(chunk);
        entries.push(TopologyEntry::from_wire(&raw));
    }
    Ok(entries)
}

/// Serialize entries back into a flat payload
pub fn encode_topology_payload(entries: &[TopologyEntry]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(entries.len() * TOPOLOGY_ENTRY_WIRE_SIZE);
    for entry in entries {
        payload.extend_from_slice(&entry.to_wire());
    }
    payload
}
