//! Durable location history backed by SQLite.
//!
//! Append-only log of every accepted position update, indexed for
//! (agent, order) range scans and latitude/longitude radius scans. Entries
//! are never updated or deleted here; retention is an external concern.

use crate::update::PositionUpdate;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;

/// One appended position observation.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub agent_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub order_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_update(update: &PositionUpdate) -> Self {
        Self {
            agent_id: update.agent_id.clone(),
            latitude: update.latitude,
            longitude: update.longitude,
            order_id: update.order_id.clone(),
            recorded_at: update.observed_at,
        }
    }
}

/// A point on a reconstructed route, ascending by `recorded_at`.
#[derive(Clone, Debug, Serialize)]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "recordedAt")]
    pub recorded_at: DateTime<Utc>,
}

/// Append-only location history store.
///
/// # Schema
/// ```sql
/// CREATE TABLE location_history (
///     id INTEGER PRIMARY KEY,
///     agent_id TEXT NOT NULL,
///     order_id TEXT,
///     latitude REAL NOT NULL,
///     longitude REAL NOT NULL,
///     recorded_at TEXT NOT NULL   -- RFC 3339 UTC, fixed-width microseconds
/// );
/// ```
///
/// Timestamps are stored with fixed-width fractional seconds so lexicographic
/// ordering matches chronological ordering.
///
/// # Thread Safety
/// - Connection is wrapped in Mutex for safe concurrent access
/// - Methods are blocking; async callers go through `spawn_blocking`
pub struct LocationHistoryStore {
    conn: Mutex<Connection>,
}

impl LocationHistoryStore {
    /// Creates or opens a history store at the given path.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open history database")?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and local development.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS location_history (
                id INTEGER PRIMARY KEY,
                agent_id TEXT NOT NULL,
                order_id TEXT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create location_history table")?;

        // Compound index for (agent, order) route scans in time order
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_agent_order_time
             ON location_history(agent_id, order_id, recorded_at)",
            [],
        )
        .context("Failed to create route index")?;

        // Geospatial index for radius scans over history
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_geo
             ON location_history(latitude, longitude)",
            [],
        )
        .context("Failed to create geo index")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Appends one entry. Failure is surfaced to the caller, never swallowed.
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                r#"
                INSERT INTO location_history (agent_id, order_id, latitude, longitude, recorded_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    entry.agent_id,
                    entry.order_id,
                    entry.latitude,
                    entry.longitude,
                    entry
                        .recorded_at
                        .to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .context("Failed to append history entry")?;
        Ok(())
    }

    /// Route points for an (agent, order) pair, ascending by `recorded_at`.
    pub fn query_route(&self, agent_id: &str, order_id: &str) -> Result<Vec<RoutePoint>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT latitude, longitude, recorded_at
                FROM location_history
                WHERE agent_id = ?1 AND order_id = ?2
                ORDER BY recorded_at ASC
                "#,
            )
            .context("Failed to prepare route query")?;

        let rows = stmt
            .query_map(params![agent_id, order_id], |row| {
                Ok((
                    row.get::<_, f64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("Failed to run route query")?;

        let mut points = Vec::new();
        for row in rows {
            let (latitude, longitude, recorded_at) = row.context("Failed to read history row")?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .context("Invalid recorded_at in history row")?
                .with_timezone(&Utc);
            points.push(RoutePoint {
                latitude,
                longitude,
                recorded_at,
            });
        }

        Ok(points)
    }

    /// Number of entries stored for an agent (all orders).
    pub fn entry_count(&self, agent_id: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM location_history WHERE agent_id = ?1",
                params![agent_id],
                |row| row.get(0),
            )
            .context("Failed to count history entries")?;
        Ok(count as usize)
    }
}
