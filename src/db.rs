use crate::batch::{BatchReport, StatusUpdateRequest, UpdatedItem};
use crate::registry::{AuditLog, StatusStatistics, VehicleRecord, VehicleRegistry};
use crate::status::{CanonicalStatus, StatusNormalizer};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Event for audit trail (every change is an event)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Vehicles Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('poor', 'average', 'good')),
            last_maintenance TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vehicles_name ON vehicles(name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: parse_timestamp(1, &timestamp_str)?,
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn vehicle_from_row(row: &Row<'_>) -> rusqlite::Result<VehicleRecord> {
    let status_str: String = row.get(2)?;
    let status = status_str.parse::<CanonicalStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let last_maintenance: Option<String> = row.get(3)?;
    let last_maintenance = match last_maintenance {
        Some(s) => Some(parse_timestamp(3, &s)?),
        None => None,
    };

    Ok(VehicleRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        status,
        last_maintenance,
    })
}

// ============================================================================
// VEHICLES
// ============================================================================

pub fn insert_vehicle(
    conn: &Connection,
    name: &str,
    status: CanonicalStatus,
    last_maintenance: Option<DateTime<Utc>>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO vehicles (name, status, last_maintenance) VALUES (?1, ?2, ?3)",
        params![
            name.trim(),
            status.as_str(),
            last_maintenance.map(|dt| dt.to_rfc3339()),
        ],
    )?;

    let id = conn.last_insert_rowid();

    let event = Event::new(
        "vehicle_added",
        "vehicle",
        &id.to_string(),
        serde_json::json!({ "name": name.trim(), "status": status.as_str() }),
        "importer",
    );
    if let Err(e) = insert_event(conn, &event) {
        warn!(id, error = %e, "failed to record vehicle_added event");
    }

    Ok(id)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;

    Ok(count)
}

/// CSV row for vehicle import: name,status[,last_maintenance]
#[derive(Debug, Deserialize)]
struct VehicleRow {
    name: String,
    status: String,
    #[serde(default)]
    last_maintenance: Option<String>,
}

/// Vehicle parsed from CSV, ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub name: String,
    pub status: CanonicalStatus,
    pub last_maintenance: Option<DateTime<Utc>>,
}

/// Load vehicles from CSV; statuses go through the synonym table
pub fn load_vehicles_csv(csv_path: &Path, statuses: &StatusNormalizer) -> Result<Vec<NewVehicle>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut vehicles = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let line = index + 2;
        let row: VehicleRow = result.with_context(|| format!("Failed to parse line {}", line))?;

        let status = statuses
            .normalize(&row.status)
            .with_context(|| format!("Invalid status on line {}", line))?;

        let last_maintenance = match row.last_maintenance.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .with_context(|| format!("Invalid last_maintenance on line {}", line))?,
            ),
        };

        vehicles.push(NewVehicle {
            name: row.name.trim().to_string(),
            status,
            last_maintenance,
        });
    }

    Ok(vehicles)
}

/// Load status update requests from CSV: vehicle_name,status
pub fn load_requests_csv(csv_path: &Path) -> Result<Vec<StatusUpdateRequest>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let requests = rdr
        .deserialize()
        .collect::<Result<Vec<StatusUpdateRequest>, _>>()
        .context("Failed to deserialize request")?;

    Ok(requests)
}

// ============================================================================
// SQLITE REGISTRY
// ============================================================================

/// VehicleRegistry backed by the `vehicles` table
pub struct SqliteRegistry {
    conn: Connection,
}

impl SqliteRegistry {
    pub fn new(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteRegistry { conn })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::new(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn insert_vehicles(&self, vehicles: &[NewVehicle]) -> Result<usize> {
        let mut inserted = 0;
        for vehicle in vehicles {
            insert_vehicle(
                &self.conn,
                &vehicle.name,
                vehicle.status,
                vehicle.last_maintenance,
            )?;
            inserted += 1;
        }
        info!(inserted, "vehicles imported");
        Ok(inserted)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<VehicleRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, name, status, last_maintenance FROM vehicles WHERE id = ?1",
                [id],
                vehicle_from_row,
            )
            .optional()?;
        Ok(record)
    }
}

impl VehicleRegistry for SqliteRegistry {
    fn get_all(&self) -> Result<Vec<VehicleRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, status, last_maintenance FROM vehicles ORDER BY id")?;

        let vehicles = stmt
            .query_map([], vehicle_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vehicles)
    }

    fn find_by_exact_name(&self, name: &str) -> Result<Vec<VehicleRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, status, last_maintenance FROM vehicles
             WHERE trim(name) = ?1
             ORDER BY id",
        )?;

        let vehicles = stmt
            .query_map([name.trim()], vehicle_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vehicles)
    }

    fn update_status(&self, id: i64, status: CanonicalStatus) -> Result<VehicleRecord> {
        let now = Utc::now();

        let changed = self.conn.execute(
            "UPDATE vehicles SET status = ?1, last_maintenance = ?2 WHERE id = ?3",
            params![status.as_str(), now.to_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(anyhow!("vehicle not found: {}", id));
        }
        debug!(id, status = status.as_str(), "vehicle status written");

        self.find_by_id(id)?
            .ok_or_else(|| anyhow!("vehicle disappeared after update: {}", id))
    }

    fn get_statistics(&self) -> Result<StatusStatistics> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM vehicles GROUP BY status")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = StatusStatistics::default();
        for (status, count) in rows {
            let count = count as usize;
            match status.parse::<CanonicalStatus>()? {
                CanonicalStatus::Poor => stats.poor = count,
                CanonicalStatus::Average => stats.average = count,
                CanonicalStatus::Good => stats.good = count,
            }
        }

        Ok(stats)
    }
}

// ============================================================================
// EVENT AUDIT LOG
// ============================================================================

/// AuditLog that writes batch events into the `events` table
pub struct EventAuditLog<'a> {
    conn: &'a Connection,
    actor: String,
}

impl<'a> EventAuditLog<'a> {
    pub fn new(conn: &'a Connection, actor: &str) -> Self {
        EventAuditLog {
            conn,
            actor: actor.to_string(),
        }
    }
}

impl AuditLog for EventAuditLog<'_> {
    fn log_batch_start(&self, batch_id: &str, total_items: usize, source: &str) -> Result<()> {
        let event = Event::new(
            "batch_started",
            "batch",
            batch_id,
            serde_json::json!({ "total_items": total_items, "source": source }),
            &self.actor,
        );
        insert_event(self.conn, &event)
    }

    fn log_status_update(&self, batch_id: &str, item: &UpdatedItem) -> Result<()> {
        let event = Event::new(
            "status_updated",
            "vehicle",
            &item.vehicle_id.to_string(),
            serde_json::json!({
                "batch_id": batch_id,
                "requested_name": item.vehicle_name,
                "old_status": item.old_status,
                "new_status": item.new_status,
                "match_type": item.match_type,
                "confidence": item.confidence,
                "duplicate_of": item.duplicate_of,
                "warnings": item.warnings,
            }),
            &self.actor,
        );
        insert_event(self.conn, &event)
    }

    fn log_status_update_error(
        &self,
        batch_id: &str,
        request: &StatusUpdateRequest,
        error: &str,
    ) -> Result<()> {
        let event = Event::new(
            "status_update_failed",
            "batch",
            batch_id,
            serde_json::json!({
                "vehicle_name": request.vehicle_name,
                "status": request.status,
                "error": error,
            }),
            &self.actor,
        );
        insert_event(self.conn, &event)
    }

    fn log_batch_complete(&self, report: &BatchReport) -> Result<()> {
        let event = Event::new(
            "batch_completed",
            "batch",
            &report.batch_id,
            serde_json::json!({
                "total": report.total,
                "requested": report.requested,
                "updated": report.updated_count(),
                "unchanged": report.unchanged_count(),
                "failed": report.failed_count(),
            }),
            &self.actor,
        );
        insert_event(self.conn, &event)
    }
}
