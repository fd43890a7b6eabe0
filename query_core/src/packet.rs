//! A datagram in flight, and the small value types used to route it.

use std::time::Instant;

/// A datagram, outbound or inbound.
///
/// For an outbound packet, `data` and `remote_addr` are non-empty; `ping_ms`
/// and `timestamp` are only meaningful on the inbound path.
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: String,
    pub remote_addr: String,
    pub protocol_id: String,
    pub data: Vec<u8>,
    pub ping_ms: Option<i64>,
    pub timestamp: Option<Instant>,
}

impl Packet {
    pub fn outbound(
        id: impl Into<String>,
        remote_addr: impl Into<String>,
        protocol_id: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            remote_addr: remote_addr.into(),
            protocol_id: protocol_id.into(),
            data,
            ping_ms: None,
            timestamp: None,
        }
    }

    pub fn inbound(remote_addr: String, data: Vec<u8>, sent_at: Option<Instant>, recv_at: Instant) -> Self {
        let ping_ms = sent_at.map(|s| recv_at.saturating_duration_since(s).as_millis() as i64);
        Self {
            id: String::new(),
            remote_addr,
            protocol_id: String::new(),
            data,
            ping_ms,
            timestamp: Some(recv_at),
        }
    }
}

/// `{remote_addr, protocol_id}` — seeds the orchestrator and is the value
/// type written into the server-protocol mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostProtocolIdPair {
    pub remote_addr: String,
    pub protocol_id: String,
}
