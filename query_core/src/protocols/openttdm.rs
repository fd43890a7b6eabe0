//! OpenTTD master server.
//!
//! Request: `\x05\x00\x06{ProtocolVer}{IPType}`. Response: a run of chunks,
//! each `[2-byte length][code==7][ip family][2-byte LE host count][6-byte
//! records]`.

use crate::error::QueryError;
use crate::helpers::{parse_binary_ipv4_entry, Cursor, ProtocolInfo};
use crate::packet::Packet;

const SLT_IPV4: u8 = 1;
const SLT_IPV6: u8 = 2;

pub fn make_request(info: &ProtocolInfo) -> Vec<u8> {
    let protocol_ver = info.get("ProtocolVer").map(String::as_str).unwrap_or("\x02").as_bytes()[0];
    let ip_type = info.get("IPType").map(String::as_str).unwrap_or("\x00").as_bytes()[0];
    vec![0x05, 0x00, 0x06, protocol_ver, ip_type]
}

pub fn parse(packet: &Packet, _info: &ProtocolInfo) -> Result<Vec<String>, QueryError> {
    let mut cursor = Cursor::new(packet.data.clone());
    let mut servers = Vec::new();

    while cursor.remaining() > 0 {
        cursor.take(2)?;
        let response_num = cursor.get_u8()?;
        if response_num != 7 {
            return Err(QueryError::MalformedPacket);
        }
        let ip_ver = cursor.get_u8()?;
        if ip_ver == SLT_IPV6 {
            return Err(QueryError::IPv6NotSupported);
        }
        if ip_ver != SLT_IPV4 {
            return Err(QueryError::MalformedPacket);
        }
        let host_num = cursor.get_u16_le()? as usize;
        if cursor.remaining() < host_num * 6 {
            return Err(QueryError::MalformedPacket);
        }
        for _ in 0..host_num {
            let raw = cursor.take(6)?;
            if let Ok(addr) = parse_binary_ipv4_entry(&raw, true) {
                servers.push(addr);
            }
        }
    }

    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_request_matches_wire_format() {
        let req = make_request(&ProtocolInfo::new());
        assert_eq!(req, vec![0x05, 0x00, 0x06, 0x02, 0x00]);
    }

    #[test]
    fn golden_response_yields_one_server() {
        let mut data = vec![0u8, 0u8, 7u8, SLT_IPV4];
        data.extend_from_slice(&[1, 0]);
        data.extend_from_slice(&[74, 208, 75, 183, 0x8B, 0x0F]);
        let packet = Packet::outbound("servers4", "master.openttd.example:3978", "OPENTTDM", data);

        let servers = parse(&packet, &ProtocolInfo::new()).unwrap();
        assert_eq!(servers, vec!["74.208.75.183:3979"]);
    }

    #[test]
    fn ipv6_is_rejected() {
        let mut data = vec![0u8, 0u8, 7u8, SLT_IPV6];
        data.extend_from_slice(&[0, 0]);
        let packet = Packet::outbound("servers4", "h", "OPENTTDM", data);
        assert_eq!(parse(&packet, &ProtocolInfo::new()), Err(QueryError::IPv6NotSupported));
    }

    #[test]
    fn wrong_response_code_is_malformed() {
        let data = vec![0u8, 0u8, 9u8, SLT_IPV4, 0, 0];
        let packet = Packet::outbound("servers4", "h", "OPENTTDM", data);
        assert_eq!(parse(&packet, &ProtocolInfo::new()), Err(QueryError::MalformedPacket));
    }

    #[test]
    fn truncated_host_list_is_malformed() {
        let mut data = vec![0u8, 0u8, 7u8, SLT_IPV4];
        data.extend_from_slice(&[2, 0]);
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        let packet = Packet::outbound("servers4", "h", "OPENTTDM", data);
        assert_eq!(parse(&packet, &ProtocolInfo::new()), Err(QueryError::MalformedPacket));
    }
}
