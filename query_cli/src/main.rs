//! Single-shot CLI entry point.
//!
//! Usage:
//!   query_cli                 # reads one JSON request object from stdin
//!   query_cli '{"hosts": …}'  # inline JSON as argv[1]
//!   query_cli request.json    # a path to a JSON file, if argv[1] doesn't parse as JSON
//!
//! Reads one request, queries, prints one JSON envelope on stdout, exits 0.

use std::env;
use std::io::Read;

use query_core::error::QueryError;
use query_core::message::{MessageBus, MsgLevel};
use query_core::orchestrator::QueryOrchestrator;
use query_core::registry::ProtocolRegistry;
use query_cli::{load_protocol_configs, tracing_level_for, AppInput, OutputEnvelope, ProtocolSummary};

fn read_request_text() -> anyhow::Result<String> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(arg) if serde_json::from_str::<serde_json::Value>(&arg).is_ok() => Ok(arg),
        Some(path) => Ok(std::fs::read_to_string(&path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn print_envelope(envelope: OutputEnvelope) {
    match serde_json::to_string(&envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => println!(r#"{{"version":"{}","status":500,"message":"failed to serialize output: {e}"}}"#, env!("CARGO_PKG_VERSION")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let request_text = read_request_text()?;

    let input: AppInput = match serde_json::from_str(&request_text) {
        Ok(input) => input,
        Err(e) => {
            print_envelope(OutputEnvelope::failure(AppInput::default(), format!("invalid JSON request: {e}")));
            return Ok(());
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(tracing_level_for(input.output_lvl))
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let configs = match load_protocol_configs(&input) {
        Ok(configs) => configs,
        Err(e) => {
            print_envelope(OutputEnvelope::failure(input, e.to_string()));
            return Ok(());
        }
    };

    let registry = ProtocolRegistry::load(&configs);

    if input.show_protocols {
        let protocols: Vec<ProtocolSummary> = registry.all().into_iter().map(ProtocolSummary::from).collect();
        let output = serde_json::json!({ "protocols": protocols });
        print_envelope(OutputEnvelope::success(input, output));
        return Ok(());
    }

    if !input.has_hosts() {
        print_envelope(OutputEnvelope::failure(input, QueryError::NoHosts.to_string()));
        return Ok(());
    }

    let bus = MessageBus::default();
    let messages = bus.sink();
    let threshold = MsgLevel::from_i32(input.output_lvl.unwrap_or(0) as i32);
    tokio::spawn(bus.run(threshold));

    let orchestrator = QueryOrchestrator::with_default_timeout(registry);
    let pairs = input.host_protocol_pairs();

    match orchestrator.run(pairs, messages).await {
        Ok(result) => {
            let output = serde_json::json!({
                "server-list": result.hosts,
                "servers": result.servers,
            });
            print_envelope(OutputEnvelope::success(input, output));
        }
        Err(e) => {
            print_envelope(OutputEnvelope::failure(input, e.to_string()));
        }
    }

    Ok(())
}
