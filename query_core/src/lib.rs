//! `query_core`
//!
//! The concurrent UDP game-server query engine: protocol registry, wire
//! codecs, UDP I/O, dispatch and merge.
//!
//! Design goals:
//! - No per-protocol `dyn Trait` — the protocol set is closed, so
//!   `protocol::ProtocolKind` is a tagged sum with a `match`-based
//!   `make_payload`/`handle` pair.
//! - Checked-read byte cursors (`helpers::Cursor`) in place of panics for
//!   malformed input.
//! - No `unsafe`.

pub mod config;
pub mod error;
pub mod helpers;
pub mod message;
pub mod model;
pub mod net;
pub mod orchestrator;
pub mod packet;
pub mod protocol;
pub mod protocols;
pub mod registry;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::error::QueryError;
    pub use crate::message::{ConsoleMsg, MessageBus, MsgLevel};
    pub use crate::model::{PlayerEntry, ServerEntry};
    pub use crate::orchestrator::QueryOrchestrator;
    pub use crate::packet::{HostProtocolIdPair, Packet};
    pub use crate::registry::{ProtocolConfig, ProtocolRegistry};
}
