//! Telemetry source - reads live battery state from the host
//!
//! On Linux the kernel exposes batteries and AC adapters under
//! `/sys/class/power_supply/<name>/`. Every read goes straight to sysfs;
//! nothing is cached.

use crate::error::{BatteryError, Result};
use crate::snapshot::BatteryReading;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default sysfs power supply class directory
pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";

/// Host capability that reports the current battery state
pub trait TelemetrySource: Send + Sync {
    fn read_current(&self) -> Result<BatteryReading>;
}

/// Linux sysfs power supply reader
#[derive(Debug, Clone)]
pub struct SysfsSource {
    root: PathBuf,
}

impl Default for SysfsSource {
    fn default() -> Self {
        Self::new(POWER_SUPPLY_ROOT)
    }
}

impl SysfsSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Supply directories sorted by name, paired with their `type` attribute
    fn supplies(&self) -> Result<Vec<(PathBuf, String)>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            BatteryError::SourceUnavailable(format!(
                "cannot read {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut supplies: Vec<(PathBuf, String)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter_map(|path| {
                let kind = read_attr(&path, "type")?;
                Some((path, kind))
            })
            .collect();
        supplies.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(supplies)
    }
}

impl TelemetrySource for SysfsSource {
    fn read_current(&self) -> Result<BatteryReading> {
        let supplies = self.supplies()?;

        // Peripherals (mice, controllers) report scope=Device
        let battery = supplies
            .iter()
            .find(|(path, kind)| {
                kind == "Battery" && read_attr(path, "scope").as_deref() != Some("Device")
            })
            .map(|(path, _)| path.clone())
            .ok_or_else(|| BatteryError::SourceUnavailable("no battery present".into()))?;

        let ac_online: Vec<bool> = supplies
            .iter()
            .filter(|(_, kind)| kind == "Mains" || kind == "USB")
            .filter_map(|(path, _)| read_num::<u8>(path, "online"))
            .map(|online| online == 1)
            .collect();

        debug!("Reading battery from {}", battery.display());
        read_battery(&battery, &ac_online)
    }
}

/// Energy figures in µWh, converted from charge figures when needed
struct Energy {
    now: Option<u64>,
    full: Option<u64>,
    full_design: Option<u64>,
}

fn read_energy(dir: &Path) -> Energy {
    if read_attr(dir, "energy_full").is_some() || read_attr(dir, "energy_now").is_some() {
        return Energy {
            now: read_num(dir, "energy_now"),
            full: read_num(dir, "energy_full"),
            full_design: read_num(dir, "energy_full_design"),
        };
    }

    // Charge-reporting batteries: µAh × µV / 10^6 = µWh
    let design_uv = read_num::<u64>(dir, "voltage_min_design")
        .or_else(|| read_num(dir, "voltage_now"));
    let to_energy = |uah: Option<u64>| -> Option<u64> {
        let uv = design_uv?;
        Some(((uah? as u128 * uv as u128) / 1_000_000) as u64)
    };

    Energy {
        now: to_energy(read_num(dir, "charge_now")),
        full: to_energy(read_num(dir, "charge_full")),
        full_design: to_energy(read_num(dir, "charge_full_design")),
    }
}

fn read_battery(dir: &Path, ac_online: &[bool]) -> Result<BatteryReading> {
    let status = read_attr(dir, "status").unwrap_or_default();
    let energy = read_energy(dir);

    let percent = read_num::<i64>(dir, "capacity")
        .or_else(|| ratio_percent(energy.now?, energy.full?))
        .ok_or_else(|| {
            BatteryError::SourceUnavailable(format!(
                "{} reports no charge level",
                dir.display()
            ))
        })?;

    let is_charging = status == "Charging";

    let ac_connected = if ac_online.is_empty() {
        matches!(status.as_str(), "Charging" | "Full")
    } else {
        ac_online.iter().any(|&online| online)
    };

    let voltage_uv = read_num::<u64>(dir, "voltage_now");
    let power_uw = read_num::<u64>(dir, "power_now").or_else(|| {
        // Some drivers report a negative current while discharging
        let current_ua = read_num::<i64>(dir, "current_now")?.unsigned_abs();
        Some(((current_ua as u128 * voltage_uv? as u128) / 1_000_000) as u64)
    });

    Ok(BatteryReading {
        time_remaining: time_remaining(&status, &energy, power_uw),
        cycle_count: read_num(dir, "cycle_count"),
        current_capacity: energy.now.map(uwh_to_mwh),
        max_capacity: energy.full.map(uwh_to_mwh),
        designed_capacity: energy.full_design.map(uwh_to_mwh),
        voltage: voltage_uv.map(|uv| uv as f64 / 1_000_000.0),
        temperature: read_num::<i64>(dir, "temp").map(|t| t as f64 / 10.0),
        kind: read_attr(dir, "technology"),
        model: read_attr(dir, "model_name"),
        manufacturer: read_attr(dir, "manufacturer"),
        serial: read_attr(dir, "serial_number"),
        ..BatteryReading::new(percent, is_charging, ac_connected)
    })
}

fn ratio_percent(now: u64, full: u64) -> Option<i64> {
    if full == 0 {
        return None;
    }
    Some((now as f64 / full as f64 * 100.0).round() as i64)
}

/// Minutes to empty when discharging, to full when charging
fn time_remaining(status: &str, energy: &Energy, power_uw: Option<u64>) -> Option<i64> {
    let power = power_uw.filter(|&p| p > 0)? as f64;
    let now = energy.now? as f64;

    let hours = match status {
        "Discharging" => now / power,
        "Charging" => (energy.full? as f64 - now).max(0.0) / power,
        _ => return None,
    };
    Some((hours * 60.0).round() as i64)
}

fn uwh_to_mwh(uwh: u64) -> u64 {
    uwh / 1000
}

/// Trimmed attribute value, `None` when missing, unreadable or empty
fn read_attr(dir: &Path, name: &str) -> Option<String> {
    let value = fs::read_to_string(dir.join(name)).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn read_num<T: std::str::FromStr>(dir: &Path, name: &str) -> Option<T> {
    read_attr(dir, name)?.parse().ok()
}
