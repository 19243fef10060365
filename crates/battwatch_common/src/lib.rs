//! Battwatch Common - battery telemetry model, source, store and service
//!
//! Shared by the daemon and its tests. The daemon crate only adds the HTTP
//! surface and process bootstrap on top of [`service::BatteryService`].

pub mod config;
pub mod dashboard;
pub mod error;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod store;

pub use config::BattwatchConfig;
pub use error::BatteryError;
pub use service::{BatteryService, HISTORY_LIMIT};
pub use snapshot::{BatteryReading, Capacity, NewSnapshot, Snapshot};
pub use source::{SysfsSource, TelemetrySource};
pub use store::SnapshotStore;
