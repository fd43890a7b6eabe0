//! The protocol capability vector: [`ProtocolEntry`] pairs a configuration
//! bag ([`ProtocolInfo`]) with a [`ProtocolKind`], a tagged sum of the wire
//! codecs in `crate::protocols`. This is the "sum of protocol kinds with a
//! common trait/interface" shape for a tagged sum of protocol kinds — the
//! protocol set is closed and known at compile time, so a `dyn Trait` would
//! buy nothing a `match` doesn't already give us.

use tokio::sync::mpsc;

use crate::error::QueryError;
use crate::helpers::ProtocolInfo;
use crate::message::{ConsoleMsg, MessageSink};
use crate::model::ServerEntry;
use crate::packet::{HostProtocolIdPair, Packet};
use crate::protocols;
use crate::registry::ProtocolRegistry;

/// One sub-request a protocol issues per target: `response_packet_num == 0`
/// means "expect at least one reply", a positive N means "expect exactly N".
#[derive(Debug, Clone)]
pub struct RequestPacketDesc {
    pub id: String,
    pub response_packet_num: u32,
}

impl RequestPacketDesc {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), response_packet_num: 0 }
    }
}

/// Where a protocol handler publishes newly learned host→protocol pairs.
#[derive(Clone)]
pub struct MappingSink(pub(crate) mpsc::UnboundedSender<HostProtocolIdPair>);

impl MappingSink {
    pub fn send(&self, pair: HostProtocolIdPair) {
        let _ = self.0.send(pair);
    }
}

/// Where a protocol handler publishes normalized (partial) server records.
#[derive(Clone)]
pub struct ServerSink(pub(crate) mpsc::UnboundedSender<ServerEntry>);

impl ServerSink {
    pub fn send(&self, entry: ServerEntry) {
        let _ = self.0.send(entry);
    }
}

/// The closed set of wire protocols this crate speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    Q3Master,
    Q3Server,
    TeeworldsMaster,
    TeeworldsServer,
    OpenttdMaster,
    OpenttdServer,
    SteamMaster,
    A2sInfo,
    MumblePing,
}

impl ProtocolKind {
    /// `response_kind` metadata surfaced through `show-protocols`; does not
    /// affect dispatch.
    pub fn response_kind(self) -> &'static str {
        match self {
            ProtocolKind::Q3Master
            | ProtocolKind::TeeworldsMaster
            | ProtocolKind::OpenttdMaster
            | ProtocolKind::SteamMaster => "Server list",
            ProtocolKind::Q3Server | ProtocolKind::TeeworldsServer | ProtocolKind::OpenttdServer | ProtocolKind::A2sInfo => {
                "Server info"
            }
            ProtocolKind::MumblePing => "Server ping",
        }
    }

    pub fn make_payload(self, packet_id: &str, info: &ProtocolInfo) -> Vec<u8> {
        match self {
            ProtocolKind::Q3Master => protocols::q3m::make_request(info),
            ProtocolKind::Q3Server => protocols::q3s::make_request(info),
            ProtocolKind::TeeworldsMaster => protocols::teeworldsm::make_request(info),
            ProtocolKind::TeeworldsServer => protocols::teeworldss::make_request(info),
            ProtocolKind::OpenttdMaster => protocols::openttdm::make_request(info),
            ProtocolKind::OpenttdServer => protocols::openttds::make_request(info),
            ProtocolKind::SteamMaster => protocols::steam::make_request(packet_id, info),
            ProtocolKind::A2sInfo => protocols::a2s::make_request(info),
            ProtocolKind::MumblePing => protocols::mumbles::make_request(info),
        }
    }

    pub fn handle(
        self,
        packet: &Packet,
        entry: &ProtocolEntry,
        registry: &ProtocolRegistry,
        messages: &MessageSink,
        mapping: &MappingSink,
        servers: &ServerSink,
    ) -> Vec<Packet> {
        match self {
            ProtocolKind::Q3Master => master_receive_handler(protocols::q3m::parse, packet, entry, registry, messages, mapping, servers),
            ProtocolKind::Q3Server => simple_receive_handler(protocols::q3s::parse, packet, entry, messages, servers),
            ProtocolKind::TeeworldsMaster => {
                master_receive_handler(protocols::teeworldsm::parse, packet, entry, registry, messages, mapping, servers)
            }
            ProtocolKind::TeeworldsServer => simple_receive_handler(protocols::teeworldss::parse, packet, entry, messages, servers),
            ProtocolKind::OpenttdMaster => {
                master_receive_handler(protocols::openttdm::parse, packet, entry, registry, messages, mapping, servers)
            }
            ProtocolKind::OpenttdServer => simple_receive_handler(protocols::openttds::parse, packet, entry, messages, servers),
            ProtocolKind::SteamMaster => protocols::steam::handle(packet, entry, registry, messages, mapping, servers),
            ProtocolKind::A2sInfo => simple_receive_handler(protocols::a2s::parse, packet, entry, messages, servers),
            ProtocolKind::MumblePing => simple_receive_handler(protocols::mumbles::parse, packet, entry, messages, servers),
        }
    }
}

/// Registry element: immutable after [`crate::registry::ProtocolRegistry::load`].
#[derive(Debug, Clone)]
pub struct ProtocolEntry {
    pub id: String,
    pub kind: ProtocolKind,
    pub transport: &'static str,
    pub information: ProtocolInfo,
    pub request_packets: Vec<RequestPacketDesc>,
}

impl ProtocolEntry {
    pub fn make_payload(&self, packet: Packet) -> Packet {
        let data = self.kind.make_payload(&packet.id, &self.information);
        Packet { data, ..packet }
    }

    pub fn handle(
        &self,
        packet: &Packet,
        registry: &ProtocolRegistry,
        messages: &MessageSink,
        mapping: &MappingSink,
        servers: &ServerSink,
    ) -> Vec<Packet> {
        self.kind.handle(packet, self, registry, messages, mapping, servers)
    }
}

/// `SimpleReceiveHandler`: a parser yielding one [`ServerEntry`] per inbound
/// packet, stamped with `protocol_id`/`host`/`status=200` and pushed to the
/// server sink. Never emits follow-up sends.
pub fn simple_receive_handler(
    parse: fn(&Packet, &ProtocolInfo) -> Result<ServerEntry, QueryError>,
    packet: &Packet,
    entry: &ProtocolEntry,
    messages: &MessageSink,
    servers: &ServerSink,
) -> Vec<Packet> {
    match parse(packet, &entry.information) {
        Ok(mut server_entry) => {
            server_entry.protocol_id = Some(entry.id.clone());
            server_entry.host = Some(packet.remote_addr.clone());
            server_entry.status = Some(200);
            if server_entry.ping_ms.is_none() {
                server_entry.ping_ms = packet.ping_ms;
            }
            servers.send(server_entry);
        }
        Err(e) => {
            messages.send(ConsoleMsg::minor(format!("{} - {} - {}", entry.id, packet.remote_addr, e)));
        }
    }
    Vec::new()
}

/// `MasterReceiveHandler`: a parser yielding a list of addresses. Each
/// address is recorded in the mapping table under `information["MasterOf"]`
/// and queried via the registry; a synthetic "Master Server" entry is
/// emitted for the master host itself.
pub fn master_receive_handler(
    parse: fn(&Packet, &ProtocolInfo) -> Result<Vec<String>, QueryError>,
    packet: &Packet,
    entry: &ProtocolEntry,
    registry: &ProtocolRegistry,
    messages: &MessageSink,
    mapping: &MappingSink,
    servers: &ServerSink,
) -> Vec<Packet> {
    match parse(packet, &entry.information) {
        Ok(addresses) => {
            let mut send_packets = Vec::new();
            if let Some(master_of) = entry.information.get("MasterOf") {
                for addr in &addresses {
                    let pair = HostProtocolIdPair { remote_addr: addr.clone(), protocol_id: master_of.clone() };
                    mapping.send(pair.clone());
                    send_packets.extend(registry.make_send_packets(&pair));
                }
            }

            let protocol_name = entry.information.get("Name").cloned().unwrap_or_else(|| entry.id.clone());
            servers.send(ServerEntry {
                protocol_id: Some(entry.id.clone()),
                host: Some(packet.remote_addr.clone()),
                name: Some(format!("{protocol_name} Server")),
                status: Some(200),
                ..Default::default()
            });

            send_packets
        }
        Err(e) => {
            messages.send(ConsoleMsg::minor(format!("{} - {} - {}", entry.id, packet.remote_addr, e)));
            Vec::new()
        }
    }
}
