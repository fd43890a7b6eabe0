//! Teeworlds game server (`gie3`/`inf3`).

use std::collections::HashMap;

use crate::error::QueryError;
use crate::helpers::{check_prelude, ProtocolInfo};
use crate::model::{PlayerEntry, ServerEntry};
use crate::packet::Packet;

const REQUEST_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF";
const RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFF\xFFinf3";
const RULE_PLAYER_BOUNDARY: usize = 10;

pub fn make_request(_info: &ProtocolInfo) -> Vec<u8> {
    let mut out = REQUEST_PRELUDE.to_vec();
    out.extend_from_slice(b"gie3\x00");
    out
}

fn parse_playerstring(tokens: &[&[u8]]) -> Result<Vec<PlayerEntry>, QueryError> {
    if tokens.len() % 5 != 0 {
        return Err(QueryError::InvalidPlayerStringLength);
    }
    let mut players = Vec::with_capacity(tokens.len() / 5);
    for chunk in tokens.chunks_exact(5) {
        let mut info = HashMap::new();
        info.insert("clan".to_string(), String::from_utf8_lossy(chunk[1]).into_owned());
        info.insert("country".to_string(), String::from_utf8_lossy(chunk[2]).into_owned());
        info.insert("score".to_string(), String::from_utf8_lossy(chunk[3]).into_owned());
        info.insert("is_player".to_string(), String::from_utf8_lossy(chunk[4]).into_owned());
        players.push(PlayerEntry { name: String::from_utf8_lossy(chunk[0]).into_owned(), ping_ms: 0, info });
    }
    Ok(players)
}

fn parse_rulestring(tokens: &[&[u8]]) -> Result<HashMap<String, String>, QueryError> {
    if tokens.len() < RULE_PLAYER_BOUNDARY {
        return Err(QueryError::InvalidRuleStringLength);
    }
    let names = ["token", "version", "name", "map", "gametype", "flags", "num_players", "max_players", "num_clients", "max_clients"];
    let mut rules = HashMap::with_capacity(names.len());
    for (name, token) in names.iter().zip(tokens.iter()) {
        rules.insert((*name).to_string(), String::from_utf8_lossy(token).into_owned());
    }
    Ok(rules)
}

fn parse_data(tokens: &[&[u8]]) -> Result<ServerEntry, QueryError> {
    if tokens.len() < RULE_PLAYER_BOUNDARY {
        return Err(QueryError::InvalidResponseLength);
    }
    let (rule_tokens, player_tokens) = tokens.split_at(RULE_PLAYER_BOUNDARY);

    let players = parse_playerstring(player_tokens)?;
    let rules = parse_rulestring(rule_tokens)?;

    let mut entry = ServerEntry::default();
    entry.name = rules.get("name").map(|v| v.trim().to_string());
    entry.need_pass = rules.get("flags").and_then(|v| v.trim().parse::<bool>().ok());
    entry.terrain = rules.get("map").map(|v| v.trim().to_string());
    entry.mod_name = Some("Teeworlds".to_string());
    entry.game_type = rules.get("gametype").map(|v| v.trim().to_string());
    entry.num_clients = Some(players.len() as i64);
    entry.max_clients = rules.get("max_clients").and_then(|v| v.trim().parse().ok());
    entry.secure = Some(false);
    entry.players = players;
    entry.rules = rules;

    Ok(entry)
}

pub fn parse(packet: &Packet, _info: &ProtocolInfo) -> Result<ServerEntry, QueryError> {
    let (body, ok) = check_prelude(&packet.data, RESPONSE_PRELUDE);
    if !ok {
        return Err(QueryError::InvalidResponsePrelude);
    }

    let trimmed = {
        let mut start = 0;
        let mut end = body.len();
        while start < end && body[start] == 0 {
            start += 1;
        }
        while end > start && body[end - 1] == 0 {
            end -= 1;
        }
        &body[start..end]
    };
    let tokens: Vec<&[u8]> = trimmed.split(|&b| b == 0).collect();

    let mut entry = parse_data(&tokens)?;
    entry.ping_ms = packet.ping_ms;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join_tokens(tokens: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, t) in tokens.iter().enumerate() {
            if i > 0 {
                out.push(0);
            }
            out.extend_from_slice(t);
        }
        out
    }

    #[test]
    fn parses_rules_and_players() {
        let rule_tokens: Vec<&[u8]> =
            vec![b"tok", b"0.6.5", b"My Server", b"dm1", b"dm", b"0", b"2", b"16", b"2", b"16"];
        let player_tokens: Vec<&[u8]> = vec![
            b"Ranger", b"", b"", b"5", b"1",
            b"Doom", b"", b"", b"3", b"1",
        ];
        let mut all = rule_tokens.clone();
        all.extend_from_slice(&player_tokens);

        let mut data = RESPONSE_PRELUDE.to_vec();
        data.extend_from_slice(&join_tokens(&all));
        let packet = Packet::outbound("info", "10.0.0.5:8305", "TEEWORLDSS", data);

        let entry = parse(&packet, &ProtocolInfo::new()).unwrap();
        assert_eq!(entry.name.as_deref(), Some("My Server"));
        assert_eq!(entry.terrain.as_deref(), Some("dm1"));
        assert_eq!(entry.game_type.as_deref(), Some("dm"));
        assert_eq!(entry.max_clients, Some(16));
        assert_eq!(entry.num_clients, Some(2));
        assert_eq!(entry.mod_name.as_deref(), Some("Teeworlds"));
        assert_eq!(entry.secure, Some(false));
        assert_eq!(entry.players.len(), 2);
        assert_eq!(entry.players[0].name, "Ranger");
    }

    #[test]
    fn wrong_prelude_is_rejected() {
        let packet = Packet::outbound("info", "h", "TEEWORLDSS", b"garbage".to_vec());
        assert_eq!(parse(&packet, &ProtocolInfo::new()), Err(QueryError::InvalidResponsePrelude));
    }

    #[test]
    fn short_body_is_rejected() {
        let mut data = RESPONSE_PRELUDE.to_vec();
        data.extend_from_slice(&join_tokens(&[b"tok", b"0.6.5"]));
        let packet = Packet::outbound("info", "h", "TEEWORLDSS", data);
        assert_eq!(parse(&packet, &ProtocolInfo::new()), Err(QueryError::InvalidResponseLength));
    }
}
