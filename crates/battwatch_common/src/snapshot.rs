//! Battery telemetry data model.
//!
//! `BatteryReading` is what the telemetry source reports right now and is
//! served unmodified by the current-status endpoint. `Snapshot` is the
//! persisted form written by ingestion, with the capacity figures grouped
//! under `capacity`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit every capacity figure is normalised to.
pub const CAPACITY_UNIT: &str = "mWh";

/// Live battery state as reported by a telemetry source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReading {
    /// Charge level, nominally 0-100 (not validated)
    pub percent: i64,
    pub is_charging: bool,
    /// Minutes until empty (discharging) or full (charging)
    pub time_remaining: Option<i64>,
    pub ac_connected: bool,
    pub cycle_count: Option<u32>,
    /// Present charge in mWh
    pub current_capacity: Option<u64>,
    /// Wear-adjusted full capacity in mWh
    pub max_capacity: Option<u64>,
    /// Factory design capacity in mWh
    pub designed_capacity: Option<u64>,
    pub capacity_unit: String,
    /// Volts
    pub voltage: Option<f64>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Cell technology, e.g. "Li-ion"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub serial: Option<String>,
}

impl BatteryReading {
    /// Reading with only the required fields set.
    pub fn new(percent: i64, is_charging: bool, ac_connected: bool) -> Self {
        Self {
            percent,
            is_charging,
            time_remaining: None,
            ac_connected,
            cycle_count: None,
            current_capacity: None,
            max_capacity: None,
            designed_capacity: None,
            capacity_unit: CAPACITY_UNIT.to_string(),
            voltage: None,
            temperature: None,
            kind: None,
            model: None,
            manufacturer: None,
            serial: None,
        }
    }
}

/// Capacity figures of a snapshot, all in mWh
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Capacity {
    pub current: Option<u64>,
    pub max: Option<u64>,
    pub designed: Option<u64>,
}

/// Snapshot fields before the store assigns identity and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub percent: i64,
    pub is_charging: bool,
    pub time_remaining: Option<i64>,
    pub ac_connected: bool,
    pub cycle_count: Option<u32>,
    pub capacity: Capacity,
    pub voltage: Option<f64>,
    pub temperature: Option<f64>,
}

impl From<&BatteryReading> for NewSnapshot {
    fn from(reading: &BatteryReading) -> Self {
        Self {
            percent: reading.percent,
            is_charging: reading.is_charging,
            time_remaining: reading.time_remaining,
            ac_connected: reading.ac_connected,
            cycle_count: reading.cycle_count,
            capacity: Capacity {
                current: reading.current_capacity,
                max: reading.max_capacity,
                designed: reading.designed_capacity,
            },
            voltage: reading.voltage,
            temperature: reading.temperature,
        }
    }
}

/// One persisted battery telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub percent: i64,
    pub is_charging: bool,
    pub time_remaining: Option<i64>,
    pub ac_connected: bool,
    pub cycle_count: Option<u32>,
    pub capacity: Capacity,
    pub voltage: Option<f64>,
    pub temperature: Option<f64>,
}

impl Snapshot {
    pub fn from_new(id: i64, timestamp: DateTime<Utc>, new: NewSnapshot) -> Self {
        Self {
            id,
            timestamp,
            percent: new.percent,
            is_charging: new.is_charging,
            time_remaining: new.time_remaining,
            ac_connected: new.ac_connected,
            cycle_count: new.cycle_count,
            capacity: new.capacity,
            voltage: new.voltage,
            temperature: new.temperature,
        }
    }
}
