//! Steam master server. Unlike the other master protocols this one paginates:
//! each response's last decoded address is either the `0.0.0.0:0` sentinel
//! (end of stream) or a continuation token fed back as the next request's
//! `last_ip`. Given that, its handler is protocol-specific rather than the
//! generic `master_receive_handler`.

use crate::helpers::{check_prelude, ProtocolInfo};
use crate::message::{ConsoleMsg, MessageSink};
use crate::model::ServerEntry;
use crate::packet::{HostProtocolIdPair, Packet};
use crate::protocol::{MappingSink, ProtocolEntry, ServerSink};
use crate::registry::ProtocolRegistry;

const RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFF\x66\x0A";

fn build_request(last_ip: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + last_ip.len());
    out.push(0x31);
    out.push(0xFF);
    out.extend_from_slice(last_ip.as_bytes());
    out.extend_from_slice(&[0, 0]);
    out
}

pub fn make_request(packet_id: &str, _info: &ProtocolInfo) -> Vec<u8> {
    if packet_id == "STEAM_REQUEST" {
        build_request("0.0.0.0:0")
    } else {
        Vec::new()
    }
}

/// Decodes a 6-byte entry unconditionally: unlike the other master
/// protocols' `a == 0` convention for "no more entries", Steam's `0.0.0.0:0`
/// is a meaningful value this handler must be able to observe.
fn decode_entry(raw: &[u8]) -> Option<String> {
    if raw.len() != 6 {
        return None;
    }
    let (a, b, c, d) = (raw[0], raw[1], raw[2], raw[3]);
    let port = (raw[4] as u16) << 8 | raw[5] as u16;
    Some(format!("{a}.{b}.{c}.{d}:{port}"))
}

pub fn handle(
    packet: &Packet,
    entry: &ProtocolEntry,
    registry: &ProtocolRegistry,
    messages: &MessageSink,
    mapping: &MappingSink,
    servers: &ServerSink,
) -> Vec<Packet> {
    let (body, ok) = check_prelude(&packet.data, RESPONSE_PRELUDE);
    if !ok {
        messages.send(ConsoleMsg::minor(format!("STEAM - {} - Prelude Error", packet.remote_addr)));
        return Vec::new();
    }
    if body.len() % 6 != 0 {
        messages.send(ConsoleMsg::minor(format!("STEAM - {} - Invalid body length.", packet.remote_addr)));
        return Vec::new();
    }

    let mut pairs = Vec::new();
    for chunk in body.chunks_exact(6) {
        match decode_entry(chunk) {
            Some(addr) => {
                if let Some(master_of) = entry.information.get("MasterOf") {
                    let pair = HostProtocolIdPair { remote_addr: addr, protocol_id: master_of.clone() };
                    mapping.send(pair.clone());
                    pairs.push(pair);
                }
            }
            None => {
                messages.send(ConsoleMsg::minor(format!("STEAM - {} - Error parsing IP in response.", packet.remote_addr)));
                return Vec::new();
            }
        }
    }

    let mut send_packets = Vec::new();
    if let Some(last) = pairs.last() {
        let last_ip = last.remote_addr.clone();
        messages.send(ConsoleMsg::debug(format!("STEAM - {} - Last IP: {}.", packet.remote_addr, last_ip)));
        if last_ip == "0.0.0.0:0" {
            messages.send(ConsoleMsg::debug("STEAM: Query complete."));
        } else {
            send_packets.push(Packet::outbound("STEAM_REQUEST", packet.remote_addr.clone(), "STEAM", build_request(&last_ip)));
        }
    }

    for pair in &pairs {
        send_packets.extend(registry.make_send_packets(pair));
    }

    servers.send(ServerEntry {
        protocol_id: Some(entry.id.clone()),
        host: Some(packet.remote_addr.clone()),
        name: Some("Steam Master Server".to_string()),
        status: Some(200),
        ..Default::default()
    });

    send_packets
}
