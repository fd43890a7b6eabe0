//! The merge actor is idempotent on equal inputs: `merge(X, X) = X`.
//! `model::tests` covers this at the `ServerEntry::merge`
//! unit level; this exercises the same property through the full pipeline,
//! where a host's UDP reply is retransmitted (a legitimate occurrence on an
//! unreliable transport) and must not corrupt the merged record.

use std::collections::HashMap;
use std::time::Duration;

use query_core::prelude::*;
use query_core::registry::ProtocolConfig;
use tokio::net::UdpSocket;

fn sample_a2s_response() -> Vec<u8> {
    let mut data = b"\xFF\xFF\xFF\xFF".to_vec();
    data.push(0x49);
    data.push(17);
    data.extend_from_slice(b"Idempotence Test\x00");
    data.extend_from_slice(b"de_dust2\x00");
    data.extend_from_slice(b"cstrike\x00");
    data.extend_from_slice(b"Counter-Strike\x00");
    data.extend_from_slice(&10u16.to_le_bytes());
    data.push(3);
    data.push(16);
    data.push(0);
    data.push(b'd');
    data.push(b'l');
    data.push(0);
    data.push(0);
    data.extend_from_slice(b"1.0.0.0\x00");
    data
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn retransmitted_reply_does_not_corrupt_the_merged_record() -> anyhow::Result<()> {
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let addr = socket.local_addr()?.to_string();

    let server_task = tokio::spawn(async move {
        let mut buf = [0u8; 512];
        let (_, from) = socket.recv_from(&mut buf).await?;
        let reply = sample_a2s_response();
        // Send the identical reply twice: the second is a duplicate
        // delivery, not a second distinct sub-request.
        socket.send_to(&reply, from).await?;
        socket.send_to(&reply, from).await?;
        Ok::<_, anyhow::Error>(())
    });

    let registry = ProtocolRegistry::load(&[ProtocolConfig { id: "A2S".into(), template: "A2S".into(), overrides: HashMap::new() }]);
    let orchestrator = QueryOrchestrator::new(registry, Duration::from_millis(300));
    let bus = MessageBus::default();
    let messages = bus.sink();
    tokio::spawn(bus.run(MsgLevel::Debug));

    let pairs = vec![HostProtocolIdPair { remote_addr: addr.clone(), protocol_id: "A2S".into() }];
    let result = orchestrator.run(pairs, messages).await?;
    server_task.await??;

    assert_eq!(result.servers.len(), 1);
    let entry = &result.servers[0];
    assert_eq!(entry.name.as_deref(), Some("Idempotence Test"));
    assert_eq!(entry.num_clients, Some(3));
    assert_eq!(entry.rules.len(), sample_rule_count());

    Ok(())
}

fn sample_rule_count() -> usize {
    // folder-name, protocol-version, server-type, server-os, version.
    5
}
