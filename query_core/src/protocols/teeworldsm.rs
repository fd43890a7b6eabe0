//! Teeworlds master server.
//!
//! Request: ten fixed prelude bytes followed by `"req2"`. Response: ten
//! `\xFF` bytes followed by `"lis2"`, then a run of 8-byte records split on
//! a ten-byte zero splitter.

use crate::error::QueryError;
use crate::helpers::check_prelude;
use crate::packet::Packet;

const REQUEST_PRELUDE: &[u8] = b"\x20\x00\x00\x00\x00\x00\xFF\xFF\xFF\xFF";
const RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFFlis2";
const SPLITTER: &[u8] = &[0u8; 10];

pub fn make_request(_info: &crate::helpers::ProtocolInfo) -> Vec<u8> {
    let mut out = REQUEST_PRELUDE.to_vec();
    out.extend_from_slice(b"req2");
    out
}

/// Splits `data` on non-overlapping occurrences of the 10-byte zero
/// `SPLITTER`, Go `bytes.Split` style. `slice::split` only matches single
/// elements, which would also break on the zero octets inside an 8-byte
/// record, so the subsequence has to be scanned for explicitly.
fn split_on_splitter(data: &[u8]) -> Vec<&[u8]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + SPLITTER.len() <= data.len() {
        if &data[i..i + SPLITTER.len()] == SPLITTER {
            parts.push(&data[start..i]);
            i += SPLITTER.len();
            start = i;
        } else {
            i += 1;
        }
    }
    parts.push(&data[start..]);
    parts
}

fn parse_master_server_entry(raw: &[u8]) -> Result<String, QueryError> {
    if raw.len() != 8 {
        return Err(QueryError::InvalidServerEntryInMasterResponse);
    }
    if raw[0] != 0xFF || raw[1] != 0xFF {
        return Err(QueryError::InvalidServerEntryInMasterResponse);
    }
    let (a, b, c, d) = (raw[2] as u32, raw[3] as u32, raw[4] as u32, raw[5] as u32);
    let port = (raw[6] as u32) * 256 + raw[7] as u32;
    if a == 0 {
        return Err(QueryError::InvalidServerEntryInMasterResponse);
    }
    Ok(format!("{a}.{b}.{c}.{d}:{port}"))
}

pub fn parse(packet: &Packet, _info: &crate::helpers::ProtocolInfo) -> Result<Vec<String>, QueryError> {
    let (body, ok) = check_prelude(&packet.data, RESPONSE_PRELUDE);
    if !ok {
        return Err(QueryError::InvalidResponsePrelude);
    }

    let mut servers = Vec::new();
    for chunk in split_on_splitter(body) {
        if let Ok(addr) = parse_master_server_entry(chunk) {
            servers.push(addr);
        }
    }
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::ProtocolInfo;

    #[test]
    fn make_request_matches_wire_format() {
        let req = make_request(&ProtocolInfo::new());
        assert_eq!(req, b"\x20\x00\x00\x00\x00\x00\xFF\xFF\xFF\xFFreq2");
    }

    #[test]
    fn golden_response_yields_one_server() {
        let mut data = RESPONSE_PRELUDE.to_vec();
        data.extend_from_slice(&[0xFF, 0xFF, 10, 0, 0, 1, 0x1F, 0x6C]);
        let packet = Packet::outbound("servers", "master.teeworlds.example:8300", "TEEWORLDSM", data);

        let servers = parse(&packet, &ProtocolInfo::new()).unwrap();
        assert_eq!(servers, vec!["10.0.0.1:8044"]);
    }

    #[test]
    fn multiple_records_split_on_ten_byte_zero_splitter() {
        let mut data = RESPONSE_PRELUDE.to_vec();
        data.extend_from_slice(&[0xFF, 0xFF, 10, 0, 0, 1, 0x1F, 0x6C]);
        data.extend_from_slice(SPLITTER);
        data.extend_from_slice(&[0xFF, 0xFF, 10, 0, 0, 2, 0x1F, 0x6D]);

        let packet = Packet::outbound("servers", "master.teeworlds.example:8300", "TEEWORLDSM", data);
        let servers = parse(&packet, &ProtocolInfo::new()).unwrap();
        assert_eq!(servers, vec!["10.0.0.1:8044", "10.0.0.2:8045"]);
    }

    #[test]
    fn wrong_prelude_is_rejected() {
        let packet = Packet::outbound("servers", "h", "TEEWORLDSM", b"garbage".to_vec());
        assert_eq!(parse(&packet, &ProtocolInfo::new()), Err(QueryError::InvalidResponsePrelude));
    }

    #[test]
    fn entries_with_wrong_marker_are_dropped() {
        let mut data = RESPONSE_PRELUDE.to_vec();
        data.extend_from_slice(&[0, 0, 10, 0, 0, 1, 0x1F, 0x6C]);
        let packet = Packet::outbound("servers", "h", "TEEWORLDSM", data);

        let servers = parse(&packet, &ProtocolInfo::new()).unwrap();
        assert!(servers.is_empty());
    }
}
