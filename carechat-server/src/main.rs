//! `CareChat` server: direct messaging between doctors and patients.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:8080
//! cargo run --bin carechat-server
//!
//! # Custom address with persistence
//! cargo run --bin carechat-server -- --bind 127.0.0.1:9100 --snapshot-path store.snap
//!
//! # Or via environment variable
//! CARECHAT_ADDR=127.0.0.1:9100 cargo run --bin carechat-server
//! ```

use std::sync::Arc;

use carechat_server::config::{ServerCliArgs, ServerConfig};
use carechat_server::server::{self, AppState};
use carechat_server::snapshot;
use carechat_server::store::DocumentStore;
use clap::Parser;

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

    tracing::info!(addr = %config.bind_addr, "starting carechat server");

    let store = Arc::new(DocumentStore::new());
    if let Some(path) = &config.snapshot_path {
        match snapshot::load(path).await {
            Ok(Some(loaded)) => {
                tracing::info!(
                    path = %path.display(),
                    conversations = loaded.conversations.len(),
                    messages = loaded.messages.len(),
                    "snapshot loaded"
                );
                store.restore(loaded).await;
            }
            Ok(None) => tracing::info!(path = %path.display(), "no snapshot yet, starting empty"),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load snapshot");
                std::process::exit(1);
            }
        }
    }

    let state = Arc::new(AppState::with_store(
        Arc::clone(&store),
        config.max_body_size,
    ));
    state.seed(&config.participants).await;

    let periodic = config.snapshot_path.clone().map(|path| {
        snapshot::spawn_periodic(Arc::clone(&store), path, config.snapshot_interval)
    });

    let handle = match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "carechat server listening");
            handle
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start carechat server");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = handle => {
            if let Err(e) = result {
                tracing::error!(error = %e, "server task failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
    }

    if let Some(task) = periodic {
        task.abort();
    }
    if let Some(path) = &config.snapshot_path {
        match snapshot::save(&store, path).await {
            Ok(()) => tracing::info!(path = %path.display(), "final snapshot written"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "final snapshot failed"),
        }
    }
}
