//! The protocol registry: declarative templates merged with per-entry
//! overrides, looked up by id during dispatch.
//!
//! Built once at startup and read-mostly thereafter. Lookup happens
//! constantly during dispatch, so entries are kept behind a
//! `RwLock<HashMap<..>>` rather than a single-writer actor: the registry
//! settles after `load` and the hot path is all readers.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::helpers::ProtocolInfo;
use crate::packet::{HostProtocolIdPair, Packet};
use crate::protocol::{ProtocolEntry, ProtocolKind, RequestPacketDesc};

/// One `[[Protocols]]` entry from the TOML config.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Template")]
    pub template: String,
    #[serde(rename = "Overrides", default)]
    pub overrides: HashMap<String, String>,
}

/// Un-id'd protocol templates, one per `Template` name recognized by the
/// TOML config schema.
fn builtin_template(name: &str) -> Option<ProtocolEntry> {
    let info = |pairs: &[(&str, &str)]| -> ProtocolInfo {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    };

    let entry = match name {
        "Q3M" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::Q3Master,
            transport: "udp",
            information: info(&[
                ("Name", "Quake III Arena Master"),
                ("SplitterUsed", "true"),
                ("RequestQueryParams", "empty full"),
                ("Version", "68"),
                ("DefaultRequestPort", "27950"),
            ]),
            request_packets: vec![RequestPacketDesc::new("servers")],
        },
        "Q3S" => {
            let challenge = format!(
                "GrokStat_{}",
                SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
            );
            ProtocolEntry {
                id: String::new(),
                kind: ProtocolKind::Q3Server,
                transport: "udp",
                information: {
                    let mut i = info(&[
                        ("Name", "Quake III Arena"),
                        ("Version", "68"),
                        ("DefaultRequestPort", "27950"),
                        ("ServerNameRule", "sv_hostname"),
                        ("NeedPassRule", "g_needpass"),
                        ("TerrainRule", "mapname"),
                        ("ModNameRule", "game"),
                        ("GameTypeRule", "g_gametype"),
                        ("MaxClientsRule", "sv_maxclients"),
                        ("SecureRule", "sv_punkbuster"),
                        ("NumBotsRule", "bot_minplayers"),
                    ]);
                    i.insert("Challenge".into(), challenge);
                    i
                },
                request_packets: vec![RequestPacketDesc::new("status")],
            }
        }
        "TEEWORLDSM" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::TeeworldsMaster,
            transport: "udp",
            information: info(&[("Name", "Teeworlds Master"), ("DefaultRequestPort", "8300")]),
            request_packets: vec![RequestPacketDesc::new("servers")],
        },
        "TEEWORLDSS" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::TeeworldsServer,
            transport: "udp",
            information: info(&[("Name", "Teeworlds Server"), ("DefaultRequestPort", "8305")]),
            request_packets: vec![RequestPacketDesc::new("info")],
        },
        "OPENTTDM" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::OpenttdMaster,
            transport: "udp",
            information: info(&[("Name", "OpenTTD Master"), ("DefaultRequestPort", "3978")]),
            request_packets: vec![RequestPacketDesc::new("servers4")],
        },
        "OPENTTDS" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::OpenttdServer,
            transport: "udp",
            information: info(&[("Name", "OpenTTD Server"), ("DefaultRequestPort", "3979")]),
            request_packets: vec![RequestPacketDesc::new("info")],
        },
        "STEAM" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::SteamMaster,
            transport: "udp",
            information: info(&[("Name", "Steam Master"), ("DefaultRequestPort", "27011")]),
            request_packets: vec![RequestPacketDesc::new("STEAM_REQUEST")],
        },
        "A2S" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::A2sInfo,
            transport: "udp",
            information: info(&[("Name", "Source Engine Server"), ("DefaultRequestPort", "27015")]),
            request_packets: vec![RequestPacketDesc::new("A2S_INFO")],
        },
        "MUMBLES" => ProtocolEntry {
            id: String::new(),
            kind: ProtocolKind::MumblePing,
            transport: "udp",
            information: info(&[("Name", "Mumble Server"), ("Challenge", "grokstat"), ("DefaultRequestPort", "64738")]),
            request_packets: vec![RequestPacketDesc::new("ping")],
        },
        _ => return None,
    };
    Some(entry)
}

pub struct ProtocolRegistry {
    entries: RwLock<HashMap<String, ProtocolEntry>>,
}

impl ProtocolRegistry {
    /// Builds the registry from declarative config records: clone the named
    /// template, overlay `overrides` onto `information`, stamp the entry's
    /// id. Unknown template names are skipped silently.
    pub fn load(configs: &[ProtocolConfig]) -> Self {
        let mut entries = HashMap::with_capacity(configs.len());
        for config in configs {
            let Some(mut entry) = builtin_template(&config.template) else {
                continue;
            };
            entry.id = config.id.clone();
            for (k, v) in &config.overrides {
                entry.information.insert(k.clone(), v.clone());
            }
            entries.insert(entry.id.clone(), entry);
        }
        Self { entries: RwLock::new(entries) }
    }

    pub fn get(&self, id: &str) -> Option<ProtocolEntry> {
        self.entries.read().expect("registry lock poisoned").get(id).cloned()
    }

    pub fn all(&self) -> Vec<ProtocolEntry> {
        self.entries.read().expect("registry lock poisoned").values().cloned().collect()
    }

    /// Writes are allowed but unused by the core dispatch pipeline.
    pub fn insert(&self, entry: ProtocolEntry) {
        self.entries.write().expect("registry lock poisoned").insert(entry.id.clone(), entry);
    }

    /// Builds the outbound packets for every `request_packets[i]` of
    /// `pair.protocol_id`, targeting `pair.remote_addr`.
    pub fn make_send_packets(&self, pair: &HostProtocolIdPair) -> Vec<Packet> {
        let Some(entry) = self.get(&pair.protocol_id) else {
            return Vec::new();
        };
        entry
            .request_packets
            .iter()
            .map(|rp| entry.make_payload(Packet::outbound(rp.id.clone(), pair.remote_addr.clone(), entry.id.clone(), Vec::new())))
            .collect()
    }
}
