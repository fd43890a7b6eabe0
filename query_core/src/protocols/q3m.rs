//! Quake III Arena master server.
//!
//! Request: `\xFF\xFF\xFF\xFF getservers {Version} {RequestQueryParams}\n`.
//! Response: `\xFF\xFF\xFF\xFFgetserversResponse` followed by either
//! `\x5C`-separated or fixed 6-byte-record entries.

use crate::error::QueryError;
use crate::helpers::{check_prelude, interpolate, parse_binary_ipv4_entry, ProtocolInfo};
use crate::packet::Packet;

const RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFFgetserversResponse";

pub fn make_request(info: &ProtocolInfo) -> Vec<u8> {
    let version = info.get("Version").map(String::as_str).unwrap_or("68");
    let params = info.get("RequestQueryParams").map(String::as_str).unwrap_or("empty full");
    let line = interpolate("getservers {Version} {RequestQueryParams}\n", &{
        let mut i = ProtocolInfo::new();
        i.insert("Version".into(), version.into());
        i.insert("RequestQueryParams".into(), params.into());
        i
    });
    let mut out = Vec::with_capacity(4 + line.len());
    out.extend_from_slice(b"\xFF\xFF\xFF\xFF");
    out.extend_from_slice(line.as_bytes());
    out
}

pub fn parse(packet: &Packet, info: &ProtocolInfo) -> Result<Vec<String>, QueryError> {
    let (body, ok) = check_prelude(&packet.data, RESPONSE_PRELUDE);
    if !ok {
        return Err(QueryError::InvalidResponsePrelude);
    }

    let splitter_used = info.get("SplitterUsed").map(String::as_str).unwrap_or("true") == "true";

    let mut servers = Vec::new();
    if splitter_used {
        for entry in body.split(|&b| b == 0x5C) {
            if let Ok(addr) = parse_binary_ipv4_entry(entry, false) {
                servers.push(addr);
            }
        }
    } else {
        if body.len() % 6 != 0 {
            return Err(QueryError::InvalidResponseLength);
        }
        for chunk in body.chunks_exact(6) {
            if let Ok(addr) = parse_binary_ipv4_entry(chunk, false) {
                servers.push(addr);
            }
        }
    }
    Ok(servers)
}
