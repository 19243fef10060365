//! Snapshot store - SQLite-backed append-only battery history
//!
//! Schema:
//! - battery_snapshots: one row per ingestion call, identity is the rowid
//!
//! Records are never updated or deleted. Reads are newest first and always
//! carry a LIMIT; there is no eviction on the write side.

use crate::error::{BatteryError, Result};
use crate::snapshot::{Capacity, NewSnapshot, Snapshot};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Where the store lives, parsed from a connection string
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
}

impl StoreLocation {
    /// Accepts `sqlite://<path>`, `sqlite::memory:`, `:memory:` or a bare path.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if url == "sqlite::memory:" || url == ":memory:" {
            return Ok(StoreLocation::Memory);
        }
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        if path.is_empty() {
            return Err(BatteryError::StoreConnectionFailed(format!(
                "empty store path in '{}'",
                url
            )));
        }
        Ok(StoreLocation::File(PathBuf::from(path)))
    }
}

const COLUMNS: &str = "id, timestamp_ms, percent, is_charging, time_remaining, ac_connected, \
                       cycle_count, capacity_current, capacity_max, capacity_designed, \
                       voltage, temperature";

/// SQLite-backed snapshot store
pub struct SnapshotStore {
    conn: Mutex<Option<Connection>>,
    location: StoreLocation,
}

impl SnapshotStore {
    /// Open the store described by a connection string
    pub fn connect(url: &str) -> Result<Self> {
        match StoreLocation::parse(url)? {
            StoreLocation::Memory => Self::open_in_memory(),
            StoreLocation::File(path) => Self::open_at(path),
        }
    }

    /// Open or create a file-backed store
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BatteryError::StoreConnectionFailed(format!(
                        "failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path_ref).map_err(connection_failed)?;

        // WAL lets history reads proceed while an insert is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(connection_failed)?;

        Self::init(conn, StoreLocation::File(path_ref.to_path_buf()))
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(connection_failed)?;
        Self::init(conn, StoreLocation::Memory)
    }

    fn init(conn: Connection, location: StoreLocation) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS battery_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ms INTEGER NOT NULL,
                percent INTEGER NOT NULL,
                is_charging INTEGER NOT NULL,
                time_remaining INTEGER,
                ac_connected INTEGER NOT NULL,
                cycle_count INTEGER,
                capacity_current INTEGER,
                capacity_max INTEGER,
                capacity_designed INTEGER,
                voltage REAL,
                temperature REAL
            );
            "#,
        )
        .map_err(connection_failed)?;

        info!("Snapshot store ready ({:?})", location);

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            location,
        })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Append one snapshot, stamping it with the current time
    pub fn insert(&self, new: NewSnapshot) -> Result<Snapshot> {
        // Millisecond precision so the returned record equals what history reads back
        let timestamp_ms = Utc::now().timestamp_millis();
        let timestamp = from_millis(timestamp_ms);

        let id = self.with_conn(BatteryError::StoreWriteFailed, |conn| {
            conn.execute(
                "INSERT INTO battery_snapshots (timestamp_ms, percent, is_charging, time_remaining,
                     ac_connected, cycle_count, capacity_current, capacity_max, capacity_designed,
                     voltage, temperature)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    timestamp_ms,
                    new.percent,
                    new.is_charging,
                    new.time_remaining,
                    new.ac_connected,
                    new.cycle_count,
                    new.capacity.current.map(|v| v as i64),
                    new.capacity.max.map(|v| v as i64),
                    new.capacity.designed.map(|v| v as i64),
                    new.voltage,
                    new.temperature,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("Stored snapshot {} ({}%)", id, new.percent);
        Ok(Snapshot::from_new(id, timestamp, new))
    }

    /// Most recent snapshots, newest first, at most `limit`
    pub fn recent(&self, limit: usize) -> Result<Vec<Snapshot>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        self.with_conn(BatteryError::StoreReadFailed, |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM battery_snapshots ORDER BY timestamp_ms DESC, id DESC LIMIT ?1",
                COLUMNS
            ))?;
            let mut snapshots = Vec::new();
            for row in stmt.query_map(params![limit as i64], row_to_snapshot)? {
                snapshots.push(row?);
            }
            Ok(snapshots)
        })
    }

    /// Total number of stored snapshots
    pub fn count(&self) -> Result<u64> {
        self.with_conn(BatteryError::StoreReadFailed, |conn| {
            conn.query_row("SELECT COUNT(*) FROM battery_snapshots", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
        })
    }

    /// Release the underlying connection. Later calls fail.
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| BatteryError::StoreConnectionFailed("store lock poisoned".into()))?;

        if let Some(conn) = guard.take() {
            conn.close()
                .map_err(|(_, e)| BatteryError::StoreConnectionFailed(e.to_string()))?;
            info!("Snapshot store closed");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn with_conn<T, F>(&self, wrap: fn(String) -> BatteryError, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|_| wrap("store lock poisoned".into()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| wrap("store is closed".into()))?;
        f(conn).map_err(|e| wrap(e.to_string()))
    }
}

fn connection_failed(e: rusqlite::Error) -> BatteryError {
    BatteryError::StoreConnectionFailed(e.to_string())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        timestamp: from_millis(row.get(1)?),
        percent: row.get(2)?,
        is_charging: row.get(3)?,
        time_remaining: row.get(4)?,
        ac_connected: row.get(5)?,
        cycle_count: row.get(6)?,
        capacity: Capacity {
            current: row.get::<_, Option<i64>>(7)?.map(|v| v as u64),
            max: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
            designed: row.get::<_, Option<i64>>(9)?.map(|v| v as u64),
        },
        voltage: row.get(10)?,
        temperature: row.get(11)?,
    })
}
