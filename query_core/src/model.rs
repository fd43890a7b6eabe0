//! The normalized, protocol-agnostic server record.

use std::collections::HashMap;

use serde::Serialize;

/// One player in a server's roster.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PlayerEntry {
    pub name: String,
    pub ping_ms: i64,
    pub info: HashMap<String, String>,
}

/// A normalized server record, folded from one or more response packets.
///
/// `status` follows the query's HTTP-flavored convention: `200` once a
/// response has been parsed, `500` on a parse failure, `503` when the host
/// never responded.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ServerEntry {
    #[serde(rename = "protocol", skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need_pass: Option<bool>,
    #[serde(rename = "modname", skip_serializing_if = "Option::is_none")]
    pub mod_name: Option<String>,
    #[serde(rename = "gametype", skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<String>,
    #[serde(rename = "numclients", skip_serializing_if = "Option::is_none")]
    pub num_clients: Option<i64>,
    #[serde(rename = "maxclients", skip_serializing_if = "Option::is_none")]
    pub max_clients: Option<i64>,
    #[serde(rename = "numbots", skip_serializing_if = "Option::is_none")]
    pub num_bots: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(rename = "ping", skip_serializing_if = "Option::is_none")]
    pub ping_ms: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<PlayerEntry>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub rules: HashMap<String, String>,
}

impl ServerEntry {
    /// Field-wise overlay: any `Some`/non-empty field on `other` replaces
    /// `self`'s; `rules` (and `players`, by extension) union-merge with the
    /// later value winning on key conflict.
    pub fn merge(&mut self, other: ServerEntry) {
        if other.protocol_id.is_some() {
            self.protocol_id = other.protocol_id;
        }
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.message.is_some() {
            self.message = other.message;
        }
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.need_pass.is_some() {
            self.need_pass = other.need_pass;
        }
        if other.mod_name.is_some() {
            self.mod_name = other.mod_name;
        }
        if other.game_type.is_some() {
            self.game_type = other.game_type;
        }
        if other.terrain.is_some() {
            self.terrain = other.terrain;
        }
        if other.num_clients.is_some() {
            self.num_clients = other.num_clients;
        }
        if other.max_clients.is_some() {
            self.max_clients = other.max_clients;
        }
        if other.num_bots.is_some() {
            self.num_bots = other.num_bots;
        }
        if other.secure.is_some() {
            self.secure = other.secure;
        }
        if other.ping_ms.is_some() {
            self.ping_ms = other.ping_ms;
        }
        if !other.players.is_empty() {
            self.players = other.players;
        }
        for (k, v) in other.rules {
            self.rules.insert(k, v);
        }
    }
}
