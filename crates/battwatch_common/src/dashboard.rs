//! Dashboard poll model
//!
//! Client-side state for a dashboard that polls the current-status and
//! history endpoints on a fixed interval. Only the current-status call
//! gates the error view; a failed history poll leaves the previous history
//! in place.

use crate::snapshot::{BatteryReading, Snapshot};
use std::time::Duration;

/// How often the dashboard re-polls both endpoints
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Battery health as a whole percentage of design capacity
///
/// `None` when either figure is unknown or the design capacity is zero.
pub fn health_percent(max: Option<u64>, designed: Option<u64>) -> Option<u32> {
    let designed = designed.filter(|&d| d > 0)?;
    let max = max?;
    Some((max as f64 / designed as f64 * 100.0).round() as u32)
}

/// What the dashboard should render
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Loading,
    Error(String),
    Ready,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    current: Option<BatteryReading>,
    history: Vec<Snapshot>,
    error: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of a current-status poll
    pub fn apply_current(&mut self, result: Result<BatteryReading, String>) {
        match result {
            Ok(reading) => {
                self.current = Some(reading);
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
    }

    /// Result of a history poll; failures keep the stale history
    pub fn apply_history(&mut self, result: Result<Vec<Snapshot>, String>) {
        if let Ok(history) = result {
            self.history = history;
        }
    }

    pub fn view(&self) -> DashboardView {
        match (&self.error, &self.current) {
            (Some(message), _) => DashboardView::Error(message.clone()),
            (None, Some(_)) => DashboardView::Ready,
            (None, None) => DashboardView::Loading,
        }
    }

    pub fn current(&self) -> Option<&BatteryReading> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    /// Health of the live reading, see [`health_percent`]
    pub fn health(&self) -> Option<u32> {
        let reading = self.current.as_ref()?;
        health_percent(reading.max_capacity, reading.designed_capacity)
    }
}
