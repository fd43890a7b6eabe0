//! The query orchestrator: seeds initial requests, owns the mapping and
//! server-data actors, runs the dispatch loop, and collects the final
//! result once the UDP server's watchdog fires.
//!
//! Three tasks besides the caller: the mapping actor (write side of the
//! `remote_addr -> protocol_id` table, fed over a channel so reads go
//! straight to the `RwLock` since the dispatch loop is the only reader and
//! it's on the hot path), the server-data merge actor (sole owner of the
//! consolidated `HashMap<String, ServerEntry>` until shutdown — it hands the final
//! map back over a one-shot when its input channel closes), and the
//! dispatch loop itself, which lives in `run` alongside seeding and
//! shutdown.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::QueryError;
use crate::helpers::remove_duplicates;
use crate::message::{ConsoleMsg, MessageSink};
use crate::model::ServerEntry;
use crate::net::{self, DEFAULT_TIMEOUT};
use crate::packet::{HostProtocolIdPair, Packet};
use crate::protocol::{MappingSink, ServerSink};
use crate::registry::ProtocolRegistry;

/// A packet whose `protocol_id` cannot be resolved through the mapping
/// table falls back to this. The mapping table is the real source of
/// truth; this is a documented placeholder, not a protocol sniffer.
fn identify_packet_protocol(_packet: &Packet) -> String {
    "STEAM".to_string()
}

/// Final, consolidated result of a query run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub servers: Vec<ServerEntry>,
    pub hosts: Vec<String>,
}

/// Drains `mapping_rx` into `table` until the last sender drops.
async fn mapping_actor(table: Arc<RwLock<HashMap<String, String>>>, mut mapping_rx: mpsc::UnboundedReceiver<HostProtocolIdPair>) {
    while let Some(pair) = mapping_rx.recv().await {
        table.write().expect("mapping table lock poisoned").insert(pair.remote_addr, pair.protocol_id);
    }
}

/// Sole owner of the server-data map: folds every partial `ServerEntry` it
/// receives by host, then, once `server_rx` closes (every `ServerSink`
/// clone has been dropped), hands the finished map back over `result_tx`.
async fn merge_actor(
    mut server_rx: mpsc::UnboundedReceiver<ServerEntry>,
    result_tx: oneshot::Sender<HashMap<String, ServerEntry>>,
) {
    let mut data: HashMap<String, ServerEntry> = HashMap::new();
    while let Some(partial) = server_rx.recv().await {
        let Some(host) = partial.host.clone() else { continue };
        data.entry(host).or_default().merge(partial);
    }
    let _ = result_tx.send(data);
}

/// Splits `"host[:port]"` into `(host, port)`, falling back to
/// `default_port` when no port is present. IPv6 literals (which would
/// contain their own `:`) are out of scope per the Non-goals.
fn split_host_port(host_spec: &str, default_port: Option<&str>) -> Result<(String, String), QueryError> {
    match host_spec.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() => {
            Ok((host.to_string(), port.to_string()))
        }
        _ => {
            let port = default_port.ok_or_else(|| QueryError::Dns(host_spec.to_string()))?;
            Ok((host_spec.to_string(), port.to_string()))
        }
    }
}

/// Resolves `host:port` to a single IPv4 socket address string. IPv6
/// results are filtered out per the Non-goals; a host that resolves to
/// nothing routable is a `Dns` error.
async fn resolve_ipv4(host: &str, port: &str) -> Result<String, QueryError> {
    let query = format!("{host}:{port}");
    let addrs = tokio::net::lookup_host(&query).await.map_err(|_| QueryError::Dns(query.clone()))?;
    addrs
        .filter(|addr| addr.is_ipv4())
        .next()
        .map(|addr| addr.to_string())
        .ok_or_else(|| QueryError::Dns(query))
}

/// Drives one end-to-end query run: seed, spawn the UDP server and actors,
/// dispatch inbound packets until the watchdog fires, then collect and
/// return the consolidated result.
pub async fn run(
    pairs: Vec<HostProtocolIdPair>,
    registry: Arc<ProtocolRegistry>,
    timeout: Duration,
    messages: MessageSink,
) -> Result<QueryResult, QueryError> {
    let mapping_table: Arc<RwLock<HashMap<String, String>>> = Arc::new(RwLock::new(HashMap::new()));
    let (mapping_tx, mapping_rx) = mpsc::unbounded_channel::<HostProtocolIdPair>();
    let (server_tx, server_rx) = mpsc::unbounded_channel::<ServerEntry>();
    let (result_tx, result_rx) = oneshot::channel();

    tokio::spawn(mapping_actor(mapping_table.clone(), mapping_rx));
    tokio::spawn(merge_actor(server_rx, result_tx));

    let mapping = MappingSink(mapping_tx);
    let servers = ServerSink(server_tx);

    let handles = net::spawn(timeout, messages.clone())
        .await
        .map_err(|e| QueryError::Dns(format!("failed to bind UDP socket: {e}")))?;

    let mut hosts_seen: Vec<HostProtocolIdPair> = Vec::new();
    let mut seed_packets = Vec::new();

    for pair in pairs {
        let Some(entry) = registry.get(&pair.protocol_id) else {
            messages.send(ConsoleMsg::minor(format!("{} - unknown protocol id, skipping.", pair.protocol_id)));
            continue;
        };

        let default_port = entry.information.get("DefaultRequestPort").map(String::as_str);
        let resolved = match split_host_port(&pair.remote_addr, default_port) {
            Ok((host, port)) => resolve_ipv4(&host, &port).await,
            Err(e) => Err(e),
        };

        let resolved_addr = match resolved {
            Ok(addr) => addr,
            Err(e) => {
                messages.send(ConsoleMsg::minor(format!("{} - {e}", pair.remote_addr)));
                servers.send(ServerEntry {
                    protocol_id: Some(pair.protocol_id.clone()),
                    host: Some(pair.remote_addr.clone()),
                    status: Some(503),
                    message: Some(e.to_string()),
                    ..Default::default()
                });
                hosts_seen.push(pair.clone());
                continue;
            }
        };

        hosts_seen.push(HostProtocolIdPair { remote_addr: resolved_addr.clone(), protocol_id: pair.protocol_id.clone() });
        mapping.send(HostProtocolIdPair { remote_addr: resolved_addr.clone(), protocol_id: pair.protocol_id.clone() });

        let resolved_pair = HostProtocolIdPair { remote_addr: resolved_addr, protocol_id: pair.protocol_id };
        seed_packets.extend(registry.make_send_packets(&resolved_pair));
    }

    let any_seeded = !seed_packets.is_empty();
    for packet in seed_packets {
        if handles.send_tx.send(packet).is_err() {
            break;
        }
    }

    // The watchdog only arms on its first activity stroke (a send or a
    // receive). If nothing was ever queued — every pair failed DNS
    // resolution — it never arms and never fires, so there is nothing to
    // wait for: finalize immediately instead of blocking on `done` forever.
    if any_seeded {
        let mut recv_rx = handles.recv_rx;
        let send_tx = handles.send_tx;
        let dispatch = async {
            while let Some(packet) = recv_rx.recv().await {
                let protocol_id = mapping_table
                    .read()
                    .expect("mapping table lock poisoned")
                    .get(&packet.remote_addr)
                    .cloned()
                    .unwrap_or_else(|| identify_packet_protocol(&packet));

                let Some(entry) = registry.get(&protocol_id) else {
                    messages.send(ConsoleMsg::minor(format!("{protocol_id} - no registry entry for inbound packet, dropping.")));
                    continue;
                };

                let follow_ups = entry.handle(&packet, &registry, &messages, &mapping, &servers);
                for follow_up in follow_ups {
                    if send_tx.send(follow_up).is_err() {
                        break;
                    }
                }
            }
        };

        tokio::select! {
            _ = dispatch => {}
            _ = handles.done => {}
        }
    }

    // Dropping `servers`/`mapping` here (end of scope) closes their
    // channels, which drains the actors and lets `merge_actor` hand back
    // the finished map.
    drop(servers);
    drop(mapping);

    let mut data = result_rx.await.unwrap_or_default();

    // A host that was seeded but never produced any response (no reply
    // before the watchdog fired) has no entry in the merge map at all;
    // synthesize a `ServerDown` (503) record for it rather than
    // silently dropping it from `servers`.
    for pair in &hosts_seen {
        data.entry(pair.remote_addr.clone()).or_insert_with(|| ServerEntry {
            protocol_id: Some(pair.protocol_id.clone()),
            host: Some(pair.remote_addr.clone()),
            status: Some(503),
            message: Some(QueryError::ServerDown.to_string()),
            ..Default::default()
        });
    }

    // Discovered hosts is every host the final server-data map
    // knows about: the seeded masters/servers plus any address a master
    // handler learned of along the way.
    let mut hosts: Vec<String> = data.keys().cloned().collect();
    hosts.sort();

    let mut server_list: Vec<ServerEntry> = data.into_values().collect();
    server_list.sort_by(|a, b| a.host.cmp(&b.host));

    Ok(QueryResult { servers: server_list, hosts: remove_duplicates(hosts) })
}

/// Convenience wrapper bundling the pieces [`run`] needs, mirroring how the
/// CLI actually constructs a run: a loaded registry plus a watchdog
/// timeout, reused across calls.
pub struct QueryOrchestrator {
    registry: Arc<ProtocolRegistry>,
    timeout: Duration,
}

impl QueryOrchestrator {
    pub fn new(registry: ProtocolRegistry, timeout: Duration) -> Self {
        Self { registry: Arc::new(registry), timeout }
    }

    pub fn with_default_timeout(registry: ProtocolRegistry) -> Self {
        Self::new(registry, DEFAULT_TIMEOUT)
    }

    pub async fn run(&self, pairs: Vec<HostProtocolIdPair>, messages: MessageSink) -> Result<QueryResult, QueryError> {
        run(pairs, self.registry.clone(), self.timeout, messages).await
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }
}
