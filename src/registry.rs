// 🚗 Vehicle Registry - the canonical list of vehicles
//
// Matching, duplicate resolution and the batch processor only ever talk to
// the registry through the VehicleRegistry trait, so the whole pipeline runs
// the same against SQLite (db.rs) and the in-memory registry below.

use crate::batch::{BatchReport, StatusUpdateRequest, UpdatedItem};
use crate::normalize::normalize_name;
use crate::status::CanonicalStatus;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

// ============================================================================
// VEHICLE RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    /// Registry row id (stable, ascending with insertion)
    pub id: i64,

    /// Canonical name as stored
    pub name: String,

    /// Current condition
    pub status: CanonicalStatus,

    /// Last time the vehicle was serviced (None = never recorded)
    pub last_maintenance: Option<DateTime<Utc>>,
}

impl VehicleRecord {
    pub fn new(id: i64, name: &str, status: CanonicalStatus) -> Self {
        VehicleRecord {
            id,
            name: name.to_string(),
            status,
            last_maintenance: None,
        }
    }

    pub fn with_last_maintenance(mut self, at: DateTime<Utc>) -> Self {
        self.last_maintenance = Some(at);
        self
    }

    /// Name used for duplicate detection
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusStatistics {
    pub poor: usize,
    pub average: usize,
    pub good: usize,
}

impl StatusStatistics {
    pub fn from_records(records: &[VehicleRecord]) -> Self {
        records.iter().fold(StatusStatistics::default(), |mut stats, record| {
            match record.status {
                CanonicalStatus::Poor => stats.poor += 1,
                CanonicalStatus::Average => stats.average += 1,
                CanonicalStatus::Good => stats.good += 1,
            }
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.poor + self.average + self.good
    }

    pub fn count(&self, status: CanonicalStatus) -> usize {
        match status {
            CanonicalStatus::Poor => self.poor,
            CanonicalStatus::Average => self.average,
            CanonicalStatus::Good => self.good,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} vehicles: {} good, {} average, {} poor",
            self.total(),
            self.good,
            self.average,
            self.poor
        )
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Vehicle store used by the matching and update pipeline
///
/// All lookups return rows in registry (insertion) order.
pub trait VehicleRegistry {
    fn get_all(&self) -> Result<Vec<VehicleRecord>>;

    /// Rows whose trimmed name is byte-equal to the trimmed query
    fn find_by_exact_name(&self, name: &str) -> Result<Vec<VehicleRecord>> {
        let query = name.trim();
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|v| v.name.trim() == query)
            .collect())
    }

    /// Rows whose trimmed name equals the trimmed query ignoring case
    fn find_by_case_insensitive_name(&self, name: &str) -> Result<Vec<VehicleRecord>> {
        let query = name.trim().to_lowercase();
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|v| v.name.trim().to_lowercase() == query)
            .collect())
    }

    /// Set a new status and stamp last-maintenance = now
    fn update_status(&self, id: i64, status: CanonicalStatus) -> Result<VehicleRecord>;

    fn get_statistics(&self) -> Result<StatusStatistics> {
        Ok(StatusStatistics::from_records(&self.get_all()?))
    }
}

/// Audit sink for batch runs
///
/// Failures are reported to the caller but the batch processor only logs them.
pub trait AuditLog {
    fn log_batch_start(&self, batch_id: &str, total_items: usize, source: &str) -> Result<()>;
    fn log_status_update(&self, batch_id: &str, item: &UpdatedItem) -> Result<()>;
    fn log_status_update_error(
        &self,
        batch_id: &str,
        request: &StatusUpdateRequest,
        error: &str,
    ) -> Result<()>;
    fn log_batch_complete(&self, report: &BatchReport) -> Result<()>;
}

/// Audit sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditLog for NullAudit {
    fn log_batch_start(&self, _batch_id: &str, _total_items: usize, _source: &str) -> Result<()> {
        Ok(())
    }

    fn log_status_update(&self, _batch_id: &str, _item: &UpdatedItem) -> Result<()> {
        Ok(())
    }

    fn log_status_update_error(
        &self,
        _batch_id: &str,
        _request: &StatusUpdateRequest,
        _error: &str,
    ) -> Result<()> {
        Ok(())
    }

    fn log_batch_complete(&self, _report: &BatchReport) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY REGISTRY
// ============================================================================

/// Registry held in memory, used for demos and tests
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    vehicles: RwLock<Vec<VehicleRecord>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }

    /// Build a registry from (name, status) pairs; ids are assigned 1..n
    pub fn from_vehicles(vehicles: &[(&str, CanonicalStatus)]) -> Self {
        let records = vehicles
            .iter()
            .zip(1..)
            .map(|((name, status), id)| VehicleRecord::new(id, name, *status))
            .collect();

        InMemoryRegistry {
            vehicles: RwLock::new(records),
        }
    }

    /// Append a vehicle and return its id
    pub fn insert(&self, name: &str, status: CanonicalStatus) -> Result<i64> {
        let mut vehicles = self
            .vehicles
            .write()
            .map_err(|_| anyhow!("vehicle registry lock poisoned"))?;

        let id = vehicles.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        vehicles.push(VehicleRecord::new(id, name, status));
        Ok(id)
    }

    /// Append a fully-formed record (id chosen by the caller)
    pub fn insert_record(&self, record: VehicleRecord) -> Result<()> {
        let mut vehicles = self
            .vehicles
            .write()
            .map_err(|_| anyhow!("vehicle registry lock poisoned"))?;
        vehicles.push(record);
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> Option<VehicleRecord> {
        let vehicles = self.vehicles.read().ok()?;
        vehicles.iter().find(|v| v.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.vehicles.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VehicleRegistry for InMemoryRegistry {
    fn get_all(&self) -> Result<Vec<VehicleRecord>> {
        let vehicles = self
            .vehicles
            .read()
            .map_err(|_| anyhow!("vehicle registry lock poisoned"))?;
        Ok(vehicles.clone())
    }

    fn update_status(&self, id: i64, status: CanonicalStatus) -> Result<VehicleRecord> {
        let mut vehicles = self
            .vehicles
            .write()
            .map_err(|_| anyhow!("vehicle registry lock poisoned"))?;

        let vehicle = vehicles
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| anyhow!("vehicle not found: {}", id))?;

        vehicle.status = status;
        vehicle.last_maintenance = Some(Utc::now());
        Ok(vehicle.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
