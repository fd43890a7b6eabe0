//! Mumble ping.

use std::collections::HashMap;

use crate::error::QueryError;
use crate::helpers::{Cursor, ProtocolInfo};
use crate::model::ServerEntry;
use crate::packet::Packet;

pub fn make_request(info: &ProtocolInfo) -> Vec<u8> {
    let challenge = info.get("Challenge").map(String::as_str).unwrap_or("grokstat");
    let mut out = vec![0x00, 0x00, 0x00, 0x00];
    out.extend_from_slice(challenge.as_bytes());
    out
}

pub fn parse(packet: &Packet, info: &ProtocolInfo) -> Result<ServerEntry, QueryError> {
    let mut cursor = Cursor::new(packet.data.clone());

    let protocol_ver_bytes = cursor.take(4)?;
    let protocol_ver = format!("{}.{}.{}", protocol_ver_bytes[1], protocol_ver_bytes[2], protocol_ver_bytes[3]);

    let resp_challenge_bytes = cursor.take(8)?;
    let resp_challenge = String::from_utf8_lossy(&resp_challenge_bytes).into_owned();
    let expected_challenge = info.get("Challenge");
    if let Some(expected) = expected_challenge {
        if expected != &resp_challenge {
            return Err(QueryError::InvalidResponseChallenge);
        }
    }

    let current_clients = cursor.get_u32_be()?;
    let max_clients = cursor.get_u32_be()?;
    let max_bandwidth = cursor.get_u32_be()?;

    let mut rules = HashMap::new();
    rules.insert("protocol-version".to_string(), protocol_ver);
    rules.insert("current-clients".to_string(), current_clients.to_string());
    rules.insert("max-clients".to_string(), max_clients.to_string());
    rules.insert("max-bandwidth".to_string(), max_bandwidth.to_string());
    if let Some(expected) = expected_challenge {
        rules.insert("challenge".to_string(), expected.clone());
    }

    let mut entry = ServerEntry::default();
    entry.max_clients = Some(max_clients as i64);
    entry.num_clients = Some(current_clients as i64);
    entry.rules = rules;
    entry.ping_ms = packet.ping_ms;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> ProtocolInfo {
        let mut i = ProtocolInfo::new();
        i.insert("Challenge".into(), "grokstat".into());
        i
    }

    #[test]
    fn make_request_matches_wire_format() {
        let req = make_request(&info());
        assert_eq!(req, b"\x00\x00\x00\x00grokstat");
    }

    #[test]
    fn golden_response_is_parsed() {
        let data = b"\x00\x01\x02\x05\x67\x72\x6F\x6B\x73\x74\x61\x74\x00\x00\x00\x02\x00\x00\x02\x00\x00\x01\x19\x40".to_vec();
        let packet = Packet::outbound("ping", "10.0.0.5:64738", "MUMBLES", data);

        let entry = parse(&packet, &info()).unwrap();
        assert_eq!(entry.num_clients, Some(2));
        assert_eq!(entry.max_clients, Some(512));
        assert_eq!(entry.rules.get("protocol-version").map(String::as_str), Some("1.2.5"));
        assert_eq!(entry.rules.get("max-bandwidth").map(String::as_str), Some("72000"));
        assert_eq!(entry.rules.get("challenge").map(String::as_str), Some("grokstat"));
    }

    #[test]
    fn mismatched_challenge_is_rejected() {
        let data = b"\x00\x01\x02\x05wrongchl\x00\x00\x00\x02\x00\x00\x02\x00\x00\x01\x19\x40".to_vec();
        let packet = Packet::outbound("ping", "h", "MUMBLES", data);
        assert_eq!(parse(&packet, &info()), Err(QueryError::InvalidResponseChallenge));
    }
}
