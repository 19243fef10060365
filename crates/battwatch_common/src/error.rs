//! Error types for battwatch.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatteryError {
    #[error("Battery telemetry unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Snapshot write failed: {0}")]
    StoreWriteFailed(String),

    #[error("Snapshot read failed: {0}")]
    StoreReadFailed(String),

    #[error("Snapshot store connection failed: {0}")]
    StoreConnectionFailed(String),
}

impl BatteryError {
    /// Short message safe to hand to HTTP clients.
    ///
    /// The detailed cause stays in the server log.
    pub fn user_message(&self) -> &'static str {
        match self {
            BatteryError::SourceUnavailable(_) => "Failed to fetch battery data",
            BatteryError::StoreReadFailed(_) => "Failed to fetch history",
            BatteryError::StoreWriteFailed(_) => "Failed to log data",
            BatteryError::StoreConnectionFailed(_) => "Snapshot store unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, BatteryError>;
