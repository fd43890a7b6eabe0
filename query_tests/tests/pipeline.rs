//! Full socket-based integration test: a master server's response chains
//! into a follow-up query against the game server it lists, end to end
//! through `QueryOrchestrator`, exercising the dispatch loop, the mapping
//! table and the merge actor together rather than any one component in
//! isolation.

use std::collections::HashMap;
use std::time::Duration;

use query_core::prelude::*;
use query_core::registry::ProtocolConfig;
use tokio::net::UdpSocket;

const Q3M_RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFFgetserversResponse";
const Q3S_RESPONSE_PRELUDE: &[u8] = b"\xFF\xFF\xFF\xFFstatusResponse";

fn encode_ipv4_entry(addr: std::net::SocketAddrV4) -> [u8; 6] {
    let octets = addr.ip().octets();
    let port = addr.port();
    [octets[0], octets[1], octets[2], octets[3], (port >> 8) as u8, port as u8]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn master_response_chains_into_server_query() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").with_test_writer().try_init();

    let game_socket = UdpSocket::bind("127.0.0.1:0").await?;
    let game_addr = match game_socket.local_addr()? {
        std::net::SocketAddr::V4(a) => a,
        _ => unreachable!("bound to an IPv4 loopback address"),
    };

    // The fake game server: answers exactly one `getstatus` with a status
    // response naming itself "Clan Arena".
    let game_task = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (n, from) = game_socket.recv_from(&mut buf).await?;
        assert!(buf[..n].starts_with(b"\xFF\xFF\xFF\xFFgetstatus "));

        let mut reply = Q3S_RESPONSE_PRELUDE.to_vec();
        reply.extend_from_slice(b"\n\\sv_hostname\\Clan Arena\\mapname\\q3dm17\\g_gametype\\4\n");
        game_socket.send_to(&reply, from).await?;
        Ok::<_, anyhow::Error>(())
    });

    let master_socket = UdpSocket::bind("127.0.0.1:0").await?;
    let master_addr = master_socket.local_addr()?.to_string();

    // The fake master: answers exactly one `getservers` by listing the
    // game server's address.
    let master_task = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (n, from) = master_socket.recv_from(&mut buf).await?;
        assert!(buf[..n].starts_with(b"\xFF\xFF\xFF\xFFgetservers "));

        let mut reply = Q3M_RESPONSE_PRELUDE.to_vec();
        reply.push(0x5C);
        reply.extend_from_slice(&encode_ipv4_entry(game_addr));
        reply.push(0x5C);
        reply.extend_from_slice(b"EOT");
        master_socket.send_to(&reply, from).await?;
        Ok::<_, anyhow::Error>(())
    });

    let mut q3m_overrides = HashMap::new();
    q3m_overrides.insert("MasterOf".to_string(), "Q3S".to_string());
    let registry = ProtocolRegistry::load(&[
        ProtocolConfig { id: "Q3M".into(), template: "Q3M".into(), overrides: q3m_overrides },
        ProtocolConfig { id: "Q3S".into(), template: "Q3S".into(), overrides: HashMap::new() },
    ]);

    let orchestrator = QueryOrchestrator::new(registry, Duration::from_millis(400));
    let bus = MessageBus::default();
    let messages = bus.sink();
    tokio::spawn(bus.run(MsgLevel::Debug));

    let pairs = vec![HostProtocolIdPair { remote_addr: master_addr.clone(), protocol_id: "Q3M".into() }];
    let result = orchestrator.run(pairs, messages).await?;

    master_task.await??;
    game_task.await??;

    // The discovered game server must appear in the server list even though
    // only the master address was seeded.
    let game_addr_str = game_addr.to_string();
    assert!(result.hosts.contains(&master_addr), "hosts: {:?}", result.hosts);
    assert!(result.hosts.contains(&game_addr_str), "hosts: {:?}", result.hosts);

    let master_entry = result.servers.iter().find(|s| s.host.as_deref() == Some(master_addr.as_str())).expect("master entry present");
    assert_eq!(master_entry.status, Some(200));
    assert!(master_entry.name.as_deref().unwrap_or_default().contains("Server"));

    let game_entry = result.servers.iter().find(|s| s.host.as_deref() == Some(game_addr_str.as_str())).expect("game server entry present");
    assert_eq!(game_entry.protocol_id.as_deref(), Some("Q3S"));
    assert_eq!(game_entry.status, Some(200));
    assert_eq!(game_entry.name.as_deref(), Some("Clan Arena"));
    assert_eq!(game_entry.terrain.as_deref(), Some("q3dm17"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresponsive_host_downgrades_to_server_down() -> anyhow::Result<()> {
    let registry = ProtocolRegistry::load(&[ProtocolConfig { id: "A2S".into(), template: "A2S".into(), overrides: HashMap::new() }]);
    let orchestrator = QueryOrchestrator::new(registry, Duration::from_millis(150));
    let bus = MessageBus::default();
    let messages = bus.sink();
    tokio::spawn(bus.run(MsgLevel::Debug));

    // Bind a socket only to reserve a real, routable loopback address that
    // nobody replies from.
    let silent_socket = UdpSocket::bind("127.0.0.1:0").await?;
    let silent_addr = silent_socket.local_addr()?.to_string();

    let pairs = vec![HostProtocolIdPair { remote_addr: silent_addr.clone(), protocol_id: "A2S".into() }];
    let result = orchestrator.run(pairs, messages).await?;

    assert_eq!(result.servers.len(), 1);
    assert_eq!(result.servers[0].host.as_deref(), Some(silent_addr.as_str()));
    assert_eq!(result.servers[0].status, Some(503));
    assert_eq!(result.servers[0].protocol_id.as_deref(), Some("A2S"));

    Ok(())
}
