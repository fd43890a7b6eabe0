//! OpenTTD server info (`OPENTTDS`), version-gated: protocol versions 2, 3
//! and 4 each add fields on top of the common layout.

use std::collections::HashMap;

use crate::error::QueryError;
use crate::helpers::{Cursor, ProtocolInfo};
use crate::model::ServerEntry;
use crate::packet::Packet;

pub fn make_request(_info: &ProtocolInfo) -> Vec<u8> {
    vec![0x03, 0x00, 0x00]
}

fn trim_nul(s: &str) -> String {
    s.trim_matches('\0').to_string()
}

pub fn parse(packet: &Packet, _info: &ProtocolInfo) -> Result<ServerEntry, QueryError> {
    if packet.data.len() < 3 {
        return Err(QueryError::MalformedPacket);
    }
    let mut cursor = Cursor::new(packet.data[3..].to_vec());

    let protocol_ver = cursor.get_u8()?;

    let mut active_newgrfs_num = 0u8;
    let mut active_newgrfs_info = String::new();
    if protocol_ver >= 4 {
        active_newgrfs_num = cursor.get_u8()?;
        let mut parts = Vec::with_capacity(active_newgrfs_num as usize);
        for _ in 0..active_newgrfs_num {
            let id = cursor.take(4)?;
            let md5 = cursor.take(16)?;
            parts.push(format!("ID:{}/MD5:{}; ", hex(&id), hex(&md5)));
        }
        active_newgrfs_info = parts.concat().trim_matches(|c| c == ' ' || c == ';').to_string();
    }

    let mut time_current = 0u32;
    let mut time_start = 0u32;
    if protocol_ver >= 3 {
        time_current = cursor.get_u32_be()?;
        time_start = cursor.get_u32_be()?;
    }

    let mut max_companies = 0u8;
    let mut current_companies = 0u8;
    let mut max_spectators = 0u8;
    if protocol_ver >= 2 {
        max_companies = cursor.get_u8()?;
        current_companies = cursor.get_u8()?;
        max_spectators = cursor.get_u8()?;
    }

    let server_name = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));
    let server_version = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));

    let language_id = cursor.get_u8()?;
    let need_pass = cursor.get_u8()? != 0;
    let max_clients = cursor.get_u8()?;
    let current_clients = cursor.get_u8()?;
    let current_spectators = cursor.get_u8()?;

    if protocol_ver < 3 {
        cursor.take(2)?;
        cursor.take(2)?;
    }

    let map_name = trim_nul(&String::from_utf8_lossy(&cursor.take_until_nul()));
    let _map_width = cursor.get_u16_be()?;
    let _map_height = cursor.get_u16_be()?;
    let map_set = cursor.get_u8()?;
    let dedicated = cursor.get_u8()?;

    let mut rules = HashMap::new();
    rules.insert("protocol-version".to_string(), protocol_ver.to_string());
    rules.insert("active-newgrfs-num".to_string(), active_newgrfs_num.to_string());
    rules.insert("active-newgrfs".to_string(), active_newgrfs_info);
    rules.insert("time-current".to_string(), time_current.to_string());
    rules.insert("time-start".to_string(), time_start.to_string());
    rules.insert("max-companies".to_string(), max_companies.to_string());
    rules.insert("current-companies".to_string(), current_companies.to_string());
    rules.insert("max-spectators".to_string(), max_spectators.to_string());
    rules.insert("server-name".to_string(), server_name.clone());
    rules.insert("server-version".to_string(), server_version);
    rules.insert("language-id".to_string(), language_id.to_string());
    rules.insert("need-pass".to_string(), need_pass.to_string());
    rules.insert("max-clients".to_string(), max_clients.to_string());
    rules.insert("current-clients".to_string(), current_clients.to_string());
    rules.insert("current-spectators".to_string(), current_spectators.to_string());
    rules.insert("map-name".to_string(), map_name.clone());
    rules.insert("map-set".to_string(), map_set.to_string());
    rules.insert("dedicated".to_string(), dedicated.to_string());

    let mut entry = ServerEntry::default();
    entry.name = Some(server_name);
    entry.max_clients = Some(max_clients as i64);
    entry.num_clients = Some(current_clients as i64);
    entry.need_pass = Some(need_pass);
    entry.terrain = Some(map_name);
    entry.rules = rules;
    entry.ping_ms = packet.ping_ms;

    Ok(entry)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
