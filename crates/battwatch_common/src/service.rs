//! Battery service - ingestion and the two read paths
//!
//! Holds explicit handles to the telemetry source and the snapshot store.
//! The store is optional: when it could not be opened at startup the
//! current-status path keeps working and the store-backed paths fail per
//! call.

use crate::error::{BatteryError, Result};
use crate::snapshot::{BatteryReading, NewSnapshot, Snapshot};
use crate::source::TelemetrySource;
use crate::store::SnapshotStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Hard cap on the history window
pub const HISTORY_LIMIT: usize = 100;

#[derive(Clone)]
pub struct BatteryService {
    source: Arc<dyn TelemetrySource>,
    store: Option<Arc<SnapshotStore>>,
}

impl BatteryService {
    pub fn new(source: Arc<dyn TelemetrySource>, store: Option<Arc<SnapshotStore>>) -> Self {
        Self { source, store }
    }

    pub fn store(&self) -> Option<&Arc<SnapshotStore>> {
        self.store.as_ref()
    }

    /// Live reading straight from the source, never persisted
    pub async fn current(&self) -> Result<BatteryReading> {
        let source = Arc::clone(&self.source);
        run_blocking(BatteryError::SourceUnavailable, move || source.read_current()).await
    }

    /// Read the source and append one snapshot
    pub async fn log_snapshot(&self) -> Result<Snapshot> {
        let reading = self.current().await?;
        let store = self.require_store(BatteryError::StoreWriteFailed)?;

        let new = NewSnapshot::from(&reading);
        let snapshot =
            run_blocking(BatteryError::StoreWriteFailed, move || store.insert(new)).await?;

        info!(
            "Logged battery snapshot {} ({}%, charging: {})",
            snapshot.id, snapshot.percent, snapshot.is_charging
        );
        Ok(snapshot)
    }

    /// Newest-first history, capped at [`HISTORY_LIMIT`]
    pub async fn history(&self, limit: usize) -> Result<Vec<Snapshot>> {
        let limit = limit.min(HISTORY_LIMIT);
        let store = self.require_store(BatteryError::StoreReadFailed)?;

        let snapshots =
            run_blocking(BatteryError::StoreReadFailed, move || store.recent(limit)).await?;
        debug!("History read: {} snapshots (limit {})", snapshots.len(), limit);
        Ok(snapshots)
    }

    fn require_store(&self, wrap: fn(String) -> BatteryError) -> Result<Arc<SnapshotStore>> {
        self.store
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| wrap("snapshot store is not connected".into()))
    }
}

/// Sysfs and SQLite calls block; keep them off the async workers
async fn run_blocking<T, F>(wrap: fn(String) -> BatteryError, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| wrap(format!("blocking task failed: {}", e)))?
}
