//! Battwatch Daemon - battery telemetry service
//!
//! Serves live battery status, records snapshots on request, and returns
//! the recent snapshot history.

use anyhow::Result;
use battwatch_common::{BatteryService, BattwatchConfig, SnapshotStore, SysfsSource};
use battwatchd::server::{self, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "battwatchd=info,battwatch_common=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Battwatch Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = BattwatchConfig::load();

    // A missing store is not fatal: current status keeps working
    let store = match SnapshotStore::connect(&config.store.url) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!("{}; history and logging will fail until restart", e);
            None
        }
    };

    let source = Arc::new(SysfsSource::new(config.source.power_supply_root.clone()));
    info!("  Telemetry source: {}", source.root().display());

    let service = BatteryService::new(source, store.clone());
    let app = server::build_router(AppState::new(service), &config.server.allowed_origins);

    let result = server::run(app, &config.listen_addr(), server::shutdown_signal()).await;

    if let Some(store) = store {
        if let Err(e) = store.close() {
            warn!("Failed to close snapshot store: {}", e);
        }
    }

    info!("Shutting down gracefully");
    result
}
