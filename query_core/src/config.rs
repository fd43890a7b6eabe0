//! Protocol configuration loading: the `[[Protocols]]` TOML table array
//! deserializes directly into [`crate::registry::ProtocolConfig`] records,
//! wrapped here so the CLI doesn't need to reach into `toml` itself.

use std::path::Path;

use serde::Deserialize;

use crate::error::QueryError;
use crate::registry::ProtocolConfig;

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "Protocols", default)]
    protocols: Vec<ProtocolConfig>,
}

/// Parses a TOML document's `[[Protocols]]` table array.
pub fn parse_toml(raw: &str) -> Result<Vec<ProtocolConfig>, QueryError> {
    let file: ConfigFile = toml::from_str(raw).map_err(|_| QueryError::ErrorLoadingConfig)?;
    Ok(file.protocols)
}

/// Reads and parses a config file from disk. A missing or unreadable file is
/// `ErrorLoadingConfig`, distinct from "no config resolvable at all"
/// (`NoConfig`, the CLI's job to detect) vs. "a config path was given but
/// couldn't be loaded."
pub fn load_from_path(path: &Path) -> Result<Vec<ProtocolConfig>, QueryError> {
    let raw = std::fs::read_to_string(path).map_err(|_| QueryError::ErrorLoadingConfig)?;
    parse_toml(&raw)
}
