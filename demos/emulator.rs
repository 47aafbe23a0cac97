//! Device emulator - serve NETCONF over TCP until Ctrl-C.
//!
//! This example demonstrates:
//! - Loading server settings from a JSON file
//! - Scripting a failing operation with a behaviour
//! - Accepting TCP connections with `Server::bind`
//!
//! # Running
//!
//! ```text
//! cargo run --example emulator -- 127.0.0.1:8300 settings.json
//! ```
//!
//! Then talk to it with any NETCONF 1.0 client, e.g.
//!
//! ```text
//! nc 127.0.0.1 8300
//! ```

use netconf_emu::rpc::{ErrorSeverity, ErrorTag, ErrorType, Operation, Query, Reply, RpcError};
use netconf_emu::{Behaviour, ServerBuilder, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:8300".to_string());

    let config = match args.next() {
        Some(path) => ServerConfig::from_json(&tokio::fs::read_to_string(path).await?)?,
        None => ServerConfig {
            store_messages: true,
            ..ServerConfig::default()
        },
    };

    // Route queries fail until the emulator is restarted
    let error = RpcError::new(
        ErrorType::Application,
        ErrorTag::OperationFailed,
        ErrorSeverity::Error,
    )
    .with_message("Routing engine unavailable");

    let server = ServerBuilder::from_config(config)
        .behaviour(Behaviour::new(
            Query::new("0", Operation::GetRouteInfo),
            Reply::new("0").with_error(error),
        ))
        .build();

    let handle = server.bind(addr).await?;
    println!("NETCONF emulator listening on {}", handle.local_addr());

    tokio::signal::ctrl_c().await?;
    handle.stop().await;

    if let Ok(json) = server.stored_messages_json() {
        println!("{json}");
    }
    Ok(())
}
