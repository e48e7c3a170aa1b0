//! `tasklist` server -- JSON-file backed REST endpoint for tasks.
//!
//! Serves `/tasks` and `/tasks/{id}` (also under `/api`) and persists every
//! change to a flat JSON file.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:3005 with ./db.json
//! cargo run --bin tasklist-server
//!
//! # Custom address and database file
//! cargo run --bin tasklist-server -- --bind 0.0.0.0:8080 --db /tmp/tasks.json
//!
//! # Or via environment variables
//! TASKLIST_ADDR=0.0.0.0:8080 TASKLIST_DB=/tmp/tasks.json cargo run --bin tasklist-server
//! ```

use std::sync::Arc;

use clap::Parser;
use tasklist_server::api::{self, ServerState};
use tasklist_server::config::{ServerCliArgs, ServerConfig};
use tasklist_server::store::TaskStore;

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
        db = %config.db_path.display(),
        "starting tasklist server"
    );

    let store = match TaskStore::open(&config.db_path).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            std::process::exit(1);
        }
    };
    let state = Arc::new(ServerState::new(store));

    match api::start_server_with_state(&config.bind_addr.to_string(), state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "tasklist server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
