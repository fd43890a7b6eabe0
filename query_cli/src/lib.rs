//! `query_cli`
//!
//! The single-shot CLI surface around `query_core`: JSON input parsing,
//! config loading (custom path or bundled default), and the JSON output
//! envelope. None of this is held to the core's rigor bar — it exists so
//! the workspace is a complete, runnable binary.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use query_core::error::QueryError;
use query_core::packet::HostProtocolIdPair;
use query_core::protocol::ProtocolEntry;
use query_core::registry::ProtocolConfig;

/// The bundled fallback protocol config, used whenever no `config-path`
/// (or `custom-config-path`) is given.
pub const DEFAULT_PROTOCOLS_TOML: &str = include_str!("../assets/default_protocols.toml");

/// One JSON request object, read from stdin or `argv[1]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInput {
    #[serde(default)]
    pub hosts: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(rename = "show-protocols", default)]
    pub show_protocols: bool,
    #[serde(rename = "output-lvl", default)]
    pub output_lvl: Option<i64>,
    #[serde(rename = "config-path", alias = "custom-config-path", default)]
    pub config_path: Option<String>,
}

impl AppInput {
    /// Flattens `hosts` into the orchestrator's seed list, preserving
    /// per-protocol ordering.
    pub fn host_protocol_pairs(&self) -> Vec<HostProtocolIdPair> {
        self.hosts
            .iter()
            .flat_map(|(protocol_id, addrs)| {
                addrs.iter().map(move |addr| HostProtocolIdPair { remote_addr: addr.clone(), protocol_id: protocol_id.clone() })
            })
            .collect()
    }

    pub fn has_hosts(&self) -> bool {
        self.hosts.values().any(|addrs| !addrs.is_empty())
    }
}

/// The JSON output envelope: `{version, status, message, input-flags,
/// output}`.
#[derive(Debug, Serialize)]
pub struct OutputEnvelope {
    pub version: String,
    pub status: u16,
    pub message: String,
    #[serde(rename = "input-flags")]
    pub input_flags: AppInput,
    pub output: serde_json::Value,
}

impl OutputEnvelope {
    pub fn success(input_flags: AppInput, output: serde_json::Value) -> Self {
        Self { version: env!("CARGO_PKG_VERSION").to_string(), status: 200, message: "OK.".to_string(), input_flags, output }
    }

    pub fn failure(input_flags: AppInput, message: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: 500,
            message: message.into(),
            input_flags,
            output: serde_json::Value::Null,
        }
    }
}

/// Metadata surfaced by `show-protocols`; mirrors `ProtocolEntry` minus the
/// dispatch-only `kind`.
#[derive(Debug, Serialize)]
pub struct ProtocolSummary {
    pub id: String,
    pub transport: &'static str,
    #[serde(rename = "response-kind")]
    pub response_kind: &'static str,
    pub information: HashMap<String, String>,
}

impl From<ProtocolEntry> for ProtocolSummary {
    fn from(entry: ProtocolEntry) -> Self {
        Self { id: entry.id, transport: entry.transport, response_kind: entry.kind.response_kind(), information: entry.information }
    }
}

/// Loads protocol config: a custom path if given (errors become
/// `ErrorLoadingConfig`, distinguishing "the custom config is broken" from
/// "there is no config at all"), otherwise the bundled default (errors
/// become `NoConfig`, since at that point there is nothing left to fall
/// back to).
pub fn load_protocol_configs(input: &AppInput) -> Result<Vec<ProtocolConfig>, QueryError> {
    match &input.config_path {
        Some(path) => query_core::config::load_from_path(Path::new(path)),
        None => query_core::config::parse_toml(DEFAULT_PROTOCOLS_TOML).map_err(|_| QueryError::NoConfig),
    }
}

/// Maps the JSON `output-lvl` integer (MAJOR=0, MINOR=1, DEBUG=2) to a
/// `tracing` level for the ambient operator-facing log, independent of the
/// query engine's own message bus.
pub fn tracing_level_for(output_lvl: Option<i64>) -> tracing::Level {
    match output_lvl {
        Some(0) => tracing::Level::WARN,
        Some(1) => tracing::Level::INFO,
        Some(n) if n >= 2 => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_protocol_pairs_flattens_map() {
        let mut input = AppInput::default();
        input.hosts.insert("Q3M".into(), vec!["a.example:27950".into(), "b.example:27950".into()]);
        let pairs = input.host_protocol_pairs();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.protocol_id == "Q3M"));
    }

    #[test]
    fn config_path_alias_deserializes() {
        let input: AppInput = serde_json::from_str(r#"{"custom-config-path": "foo.toml"}"#).unwrap();
        assert_eq!(input.config_path.as_deref(), Some("foo.toml"));
    }

    #[test]
    fn default_protocols_toml_parses() {
        let configs = query_core::config::parse_toml(DEFAULT_PROTOCOLS_TOML).unwrap();
        assert!(!configs.is_empty());
    }

    #[test]
    fn has_hosts_is_false_for_empty_lists() {
        let mut input = AppInput::default();
        input.hosts.insert("Q3M".into(), vec![]);
        assert!(!input.has_hosts());
    }
}
