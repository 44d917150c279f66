//! Taskboard task service.
//!
//! An axum REST server holding tasks in memory. Fault injection makes it
//! fail or stall a share of requests so client retry and rollback can be
//! watched end to end.
//!
//! ```bash
//! # Reliable server on 127.0.0.1:8080
//! cargo run --bin taskboard-server
//!
//! # Flaky server with demo data
//! cargo run --bin taskboard-server -- --seed --failure-rate 0.3 --latency-ms 500
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_server::api::{self, ApiState};
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::faults::FaultInjector;
use taskboard_server::table::TaskTable;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        failure_rate = config.failure_rate,
        latency_ms = config.latency.as_millis(),
        seed = config.seed,
        "starting taskboard server"
    );

    let table = if config.seed {
        TaskTable::seeded()
    } else {
        TaskTable::new()
    };
    let faults = FaultInjector::new(config.failure_rate, config.latency);
    let state = Arc::new(ApiState::with_parts(table, faults));

    match api::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "task server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "task server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start task server");
            std::process::exit(1);
        }
    }
}
