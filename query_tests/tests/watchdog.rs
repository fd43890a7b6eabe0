//! Scenario 7: with no incoming packets and all sends complete, the
//! pipeline's `done` signal (here, `QueryOrchestrator::run` returning) must
//! fire within `timeout + epsilon`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use query_core::prelude::*;
use query_core::registry::ProtocolConfig;

#[tokio::test]
async fn pipeline_terminates_within_timeout_of_last_activity() -> anyhow::Result<()> {
    let registry = ProtocolRegistry::load(&[ProtocolConfig { id: "Q3S".into(), template: "Q3S".into(), overrides: HashMap::new() }]);
    let timeout = Duration::from_millis(150);
    let orchestrator = QueryOrchestrator::new(registry, timeout);

    let bus = MessageBus::default();
    let messages = bus.sink();
    tokio::spawn(bus.run(MsgLevel::Debug));

    // Port 1 on loopback: nothing answers, so the send arms the watchdog
    // and the pipeline should settle once `timeout` elapses with no reply.
    let pairs = vec![HostProtocolIdPair { remote_addr: "127.0.0.1:1".into(), protocol_id: "Q3S".into() }];

    let start = Instant::now();
    let result = orchestrator.run(pairs, messages).await?;
    let elapsed = start.elapsed();

    assert!(elapsed < timeout + Duration::from_secs(2), "took {elapsed:?}, expected close to {timeout:?}");
    assert_eq!(result.hosts, vec!["127.0.0.1:1".to_string()]);
    assert_eq!(result.servers.len(), 1);
    assert_eq!(result.servers[0].status, Some(503));

    Ok(())
}

#[tokio::test]
async fn pipeline_with_no_seedable_hosts_returns_immediately() -> anyhow::Result<()> {
    let registry = ProtocolRegistry::load(&[]);
    let orchestrator = QueryOrchestrator::new(registry, Duration::from_secs(5));

    let bus = MessageBus::default();
    let messages = bus.sink();
    tokio::spawn(bus.run(MsgLevel::Debug));

    let start = Instant::now();
    let result = orchestrator.run(vec![], messages).await?;
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_secs(1), "an empty pair list must not wait on the watchdog");
    assert!(result.servers.is_empty());
    assert!(result.hosts.is_empty());

    Ok(())
}
