//! The query engine's error taxonomy.
//!
//! Configuration errors abort before any query is issued. Transport and
//! structural errors are caught per host by the dispatch loop and downgrade
//! the affected [`crate::model::ServerEntry`] rather than aborting the
//! pipeline (see `orchestrator`/`protocol::handlers`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Default config file not found.")]
    NoConfig,
    #[error("Error loading custom config file.")]
    ErrorLoadingConfig,
    #[error("Invalid protocol specified.")]
    InvalidProtocol,
    #[error("Invalid query part attached to master protocol.")]
    InvalidMasterOf,
    #[error("Please specify the hosts to query.")]
    NoHosts,
    #[error("Please specify the protocol.")]
    NoProtocol,

    #[error("Server down.")]
    ServerDown,
    #[error("Could not resolve host: {0}")]
    Dns(String),

    #[error("Invalid response prelude.")]
    InvalidResponsePrelude,
    #[error("Invalid response length.")]
    InvalidResponseLength,
    #[error("Invalid server header.")]
    InvalidServerHeader,
    #[error("Invalid response challenge.")]
    InvalidResponseChallenge,
    #[error("Malformed packet.")]
    MalformedPacket,
    #[error("IPv6 is not supported.")]
    IPv6NotSupported,

    #[error("Invalid server entry in the master server response.")]
    InvalidServerEntryInMasterResponse,
    #[error("Invalid player string.")]
    InvalidPlayerString,
    #[error("Invalid player string length.")]
    InvalidPlayerStringLength,
    #[error("Invalid rule string.")]
    InvalidRuleString,
    #[error("Invalid rule string length.")]
    InvalidRuleStringLength,
}
