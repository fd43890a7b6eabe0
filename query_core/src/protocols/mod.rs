//! Bit-exact wire codecs, one module per supported protocol. Every module
//! exposes `make_request` (and, for Steam, a payload builder keyed by
//! packet id) plus a `parse` function consumed by
//! `crate::protocol::{simple_receive_handler, master_receive_handler}`.

pub mod a2s;
pub mod mumbles;
pub mod openttdm;
pub mod openttds;
pub mod q3m;
pub mod q3s;
pub mod steam;
pub mod teeworldsm;
pub mod teeworldss;
