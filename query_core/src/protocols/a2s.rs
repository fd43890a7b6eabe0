//! Source engine `A2S_INFO`.

use std::collections::HashMap;

use crate::error::QueryError;
use crate::helpers::{check_prelude, Cursor, ProtocolInfo};
use crate::model::ServerEntry;
use crate::packet::Packet;

const REQUEST_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFFTSource Engine Query\x00";
const RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFF";
const THE_SHIP_APP_ID: u16 = 2400;

pub fn make_request(_info: &ProtocolInfo) -> Vec<u8> {
    REQUEST_PRELUDE.to_vec()
}

fn trim_nul(s: &str) -> String {
    s.trim_matches('\0').to_string()
}

pub fn parse(packet: &Packet, _info: &ProtocolInfo) -> Result<ServerEntry, QueryError> {
    let (body, ok) = check_prelude(&packet.data, RESPONSE_PRELUDE);
    if !ok {
        return Err(QueryError::InvalidResponsePrelude);
    }

    let mut cursor = Cursor::new(body.to_vec());

    let header = cursor.get_u8()?;
    if header != 0x49 {
        return Err(QueryError::InvalidServerHeader);
    }

    let protocol_ver = cursor.get_u8()?;
    let server_name = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));
    let map_name = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));
    let folder_name = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));
    let mod_name = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));

    let steam_app_id = cursor.get_u16_le()?;

    let num_players = cursor.get_u8()?;
    let max_players = cursor.get_u8()?;
    let num_bots = cursor.get_u8()?;

    let server_type = match cursor.get_u8()? {
        b'd' => "dedicated",
        b'l' => "non-dedicated",
        b'p' => "proxy",
        _ => return Err(QueryError::InvalidResponseLength),
    };

    let server_os = match cursor.get_u8()? {
        b'l' => "linux",
        b'w' => "windows",
        b'm' | b'o' => "osx",
        _ => return Err(QueryError::InvalidResponseLength),
    };

    let need_pass = match cursor.get_u8()? {
        0 => false,
        1 => true,
        _ => return Err(QueryError::InvalidResponseLength),
    };

    let secure = match cursor.get_u8()? {
        0 => false,
        1 => true,
        _ => return Err(QueryError::InvalidResponseLength),
    };

    let mut additional_rules = HashMap::new();
    if steam_app_id == THE_SHIP_APP_ID {
        additional_rules.insert("theship-mode".to_string(), cursor.get_u8()?.to_string());
        additional_rules.insert("theship-witnesses".to_string(), cursor.get_u8()?.to_string());
        additional_rules.insert("theship-duration".to_string(), cursor.get_u8()?.to_string());
    }

    let version = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));

    let mut rules = HashMap::new();
    rules.insert("folder-name".to_string(), folder_name);
    rules.insert("protocol-version".to_string(), protocol_ver.to_string());
    rules.insert("server-type".to_string(), server_type.to_string());
    rules.insert("server-os".to_string(), server_os.to_string());
    rules.insert("version".to_string(), version);
    rules.extend(additional_rules);

    let mut entry = ServerEntry::default();
    entry.name = Some(server_name);
    entry.terrain = Some(map_name);
    entry.mod_name = Some(mod_name);
    entry.num_clients = Some(num_players as i64);
    entry.max_clients = Some(max_players as i64);
    entry.num_bots = Some(num_bots as i64);
    entry.need_pass = Some(need_pass);
    entry.secure = Some(secure);
    entry.rules = rules;
    entry.ping_ms = packet.ping_ms;

    Ok(entry)
}
