//! Quake III Arena game server (`getstatus`/`statusResponse`).

use std::collections::HashMap;

use crate::error::QueryError;
use crate::helpers::{check_prelude, ProtocolInfo};
use crate::model::{PlayerEntry, ServerEntry};
use crate::packet::Packet;

const RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFFstatusResponse";

pub fn make_request(info: &ProtocolInfo) -> Vec<u8> {
    let challenge = info.get("Challenge").map(String::as_str).unwrap_or("GrokStat");
    let mut out = Vec::new();
    out.extend_from_slice(b"\xFF\xFF\xFF\xFF");
    out.extend_from_slice(format!("getstatus {challenge}\n").as_bytes());
    out
}

fn parse_rulestring(tokens: &[&[u8]]) -> HashMap<String, String> {
    // The rule stream starts with a leading separator, so it reads as
    // `["", key, value, key, value, ...]`: odd indices are keys, even
    // indices (after the empty lead-in) are values for the preceding key.
    let mut rules = HashMap::new();
    let mut pending_key: Option<&[u8]> = None;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_empty() {
            continue;
        }
        if i % 2 == 1 {
            pending_key = Some(token);
        } else if let Some(key) = pending_key.take() {
            rules.insert(String::from_utf8_lossy(key).into_owned(), String::from_utf8_lossy(token).into_owned());
        }
    }
    rules
}

fn parse_playerstring(lines: &[&[u8]]) -> Vec<PlayerEntry> {
    let mut players = Vec::new();
    for line in lines {
        let parts: Vec<&[u8]> = line.splitn(3, |&b| b == b' ').collect();
        if parts.len() < 3 {
            continue;
        }
        let ping_ms = std::str::from_utf8(parts[1]).ok().and_then(|s| s.parse().ok()).unwrap_or(0);
        let name = String::from_utf8_lossy(parts[2]).trim_matches('"').to_string();
        let mut info = HashMap::new();
        info.insert("score".to_string(), String::from_utf8_lossy(parts[0]).into_owned());
        players.push(PlayerEntry { name, ping_ms, info });
    }
    players
}

pub fn parse(packet: &Packet, info: &ProtocolInfo) -> Result<ServerEntry, QueryError> {
    let (body, ok) = check_prelude(&packet.data, RESPONSE_PRELUDE);
    if !ok {
        return Err(QueryError::InvalidResponsePrelude);
    }

    let trimmed = {
        let mut start = 0;
        let mut end = body.len();
        while end > 0 && body[end - 1] == 0x0A {
            end -= 1;
        }
        while start < end && body[start] == 0x0A {
            start += 1;
        }
        &body[start..end]
    };
    let lines: Vec<&[u8]> = trimmed.split(|&b| b == 0x0A).collect();

    let rule_player_boundary = lines.iter().position(|l| l.first() != Some(&0x5C)).unwrap_or(lines.len());
    let rule_lines = &lines[..rule_player_boundary];
    let player_lines = &lines[rule_player_boundary..];

    let joined_rules: Vec<u8> = rule_lines.join(&0x5C);
    let rule_tokens: Vec<&[u8]> = joined_rules.split(|&b| b == 0x5C).collect();

    let rules_bytes = parse_rulestring(&rule_tokens);
    let players = parse_playerstring(player_lines);

    let mut entry = ServerEntry { num_clients: Some(players.len() as i64), ..Default::default() };
    entry.ping_ms = packet.ping_ms;

    if let Some(rule_name) = info.get("ServerNameRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.name = Some(v.trim().to_string());
        }
    }
    if let Some(rule_name) = info.get("NeedPassRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.need_pass = v.trim().parse::<bool>().ok().or_else(|| Some(v.trim() == "1"));
        }
    }
    if let Some(rule_name) = info.get("TerrainRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.terrain = Some(v.trim().to_string());
        }
    }
    if let Some(rule_name) = info.get("ModNameRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.mod_name = Some(v.trim().to_string());
        }
    }
    if let Some(rule_name) = info.get("GameTypeRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.game_type = Some(v.trim().to_string());
        }
    }
    if let Some(rule_name) = info.get("SecureRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.secure = v.trim().parse::<bool>().ok().or_else(|| Some(v.trim() == "1"));
        }
    }
    if let Some(rule_name) = info.get("MaxClientsRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.max_clients = v.trim().parse().ok();
        }
    }
    if let Some(rule_name) = info.get("NumBotsRule") {
        if let Some(v) = rules_bytes.get(rule_name) {
            entry.num_bots = v.trim().parse().ok();
        }
    }

    entry.players = players;
    entry.rules = rules_bytes;

    Ok(entry)
}
