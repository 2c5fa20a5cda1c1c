// 🔁 Duplicate Resolver - several registry rows, one vehicle name
//
// Duplicates are data, not errors: callers list them, then pick one row
// with an explicit criterion. Without one, the first row in registry order
// wins.

use crate::normalize::normalize_name;
use crate::registry::{VehicleRecord, VehicleRegistry};
use crate::status::CanonicalStatus;
use anyhow::Result;
use serde::{Deserialize, Serialize};

// ============================================================================
// RESOLUTION CRITERIA
// ============================================================================

/// Tie-break policy; applied in field order, first criterion that picks a row wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCriteria {
    /// Pick the first row currently in this status
    pub preferred_status: Option<CanonicalStatus>,

    /// Pick the row with the smallest id
    pub prefer_older: bool,

    /// Pick the most recently serviced row
    pub prefer_recent_maintenance: bool,
}

impl ResolutionCriteria {
    pub fn preferred_status(status: CanonicalStatus) -> Self {
        ResolutionCriteria {
            preferred_status: Some(status),
            ..Default::default()
        }
    }

    pub fn prefer_older() -> Self {
        ResolutionCriteria {
            prefer_older: true,
            ..Default::default()
        }
    }

    pub fn prefer_recent_maintenance() -> Self {
        ResolutionCriteria {
            prefer_recent_maintenance: true,
            ..Default::default()
        }
    }
}

// ============================================================================
// DUPLICATE GROUP
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub normalized_name: String,
    pub records: Vec<VehicleRecord>,
}

impl DuplicateGroup {
    pub fn summary(&self) -> String {
        let ids: Vec<String> = self.records.iter().map(|r| format!("#{}", r.id)).collect();
        format!(
            "'{}': {} rows ({})",
            self.normalized_name,
            self.records.len(),
            ids.join(", ")
        )
    }
}

// ============================================================================
// DUPLICATE RESOLVER
// ============================================================================

pub struct DuplicateResolver<'a, R: VehicleRegistry + ?Sized> {
    registry: &'a R,
}

impl<'a, R: VehicleRegistry + ?Sized> DuplicateResolver<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        DuplicateResolver { registry }
    }

    /// All rows whose normalized name equals the normalized query
    pub fn find_duplicates(&self, name: &str) -> Result<Vec<VehicleRecord>> {
        let key = normalize_name(name);
        Ok(self
            .registry
            .get_all()?
            .into_iter()
            .filter(|v| normalize_name(&v.name) == key)
            .collect())
    }

    /// Every group of two or more rows sharing a normalized name
    ///
    /// Groups are ordered by the registry position of their first row.
    pub fn find_all_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>> {
        let mut groups: Vec<DuplicateGroup> = Vec::new();

        for vehicle in self.registry.get_all()? {
            let key = normalize_name(&vehicle.name);
            match groups.iter_mut().find(|g| g.normalized_name == key) {
                Some(group) => group.records.push(vehicle),
                None => groups.push(DuplicateGroup {
                    normalized_name: key,
                    records: vec![vehicle],
                }),
            }
        }

        groups.retain(|g| g.records.len() > 1);
        Ok(groups)
    }

    /// Pick one row out of a duplicate set
    pub fn resolve(
        &self,
        duplicates: &[VehicleRecord],
        criteria: &ResolutionCriteria,
    ) -> Option<VehicleRecord> {
        resolve_duplicates(duplicates, criteria)
    }
}

/// Pick one row out of a duplicate set (registry-independent)
pub fn resolve_duplicates(
    duplicates: &[VehicleRecord],
    criteria: &ResolutionCriteria,
) -> Option<VehicleRecord> {
    if duplicates.len() <= 1 {
        return duplicates.first().cloned();
    }

    // (a) Explicit status
    if let Some(status) = criteria.preferred_status {
        if let Some(record) = duplicates.iter().find(|r| r.status == status) {
            return Some(record.clone());
        }
    }

    // (b) Oldest row
    if criteria.prefer_older {
        return duplicates.iter().min_by_key(|r| r.id).cloned();
    }

    // (c) Most recent maintenance; rows without a timestamp never win
    if criteria.prefer_recent_maintenance {
        let mut latest: Option<&VehicleRecord> = None;
        for record in duplicates.iter().filter(|r| r.last_maintenance.is_some()) {
            match latest {
                Some(best) if best.last_maintenance >= record.last_maintenance => {}
                _ => latest = Some(record),
            }
        }
        if let Some(record) = latest {
            return Some(record.clone());
        }
    }

    // (d) Registry order
    duplicates.first().cloned()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use chrono::{Duration, Utc};

    fn duplicate_set() -> Vec<VehicleRecord> {
        let now = Utc::now();
        vec![
            VehicleRecord::new(7, "BMW 4-Series", CanonicalStatus::Good)
                .with_last_maintenance(now - Duration::days(30)),
            VehicleRecord::new(3, "bmw 4-series", CanonicalStatus::Poor),
            VehicleRecord::new(9, "BMW  4-Series.", CanonicalStatus::Average)
                .with_last_maintenance(now - Duration::days(2)),
        ]
    }

    #[test]
    fn test_find_duplicates() {
        let registry = InMemoryRegistry::from_vehicles(&[
            ("BMW 4-Series", CanonicalStatus::Good),
            ("Audi RS6", CanonicalStatus::Average),
            ("bmw  4-series!", CanonicalStatus::Poor),
        ]);
        let resolver = DuplicateResolver::new(&registry);

        let duplicates = resolver.find_duplicates("BMW 4-SERIES").unwrap();

        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].id, 1);
        assert_eq!(duplicates[1].id, 3);
        assert!(resolver.find_duplicates("Toyota Supra").unwrap().is_empty());
    }

    #[test]
    fn test_find_all_duplicate_groups() {
        let registry = InMemoryRegistry::from_vehicles(&[
            ("Audi RS6", CanonicalStatus::Average),
            ("BMW 4-Series", CanonicalStatus::Good),
            ("audi rs6", CanonicalStatus::Poor),
            ("Kia Rio", CanonicalStatus::Poor),
            ("bmw 4-series", CanonicalStatus::Poor),
        ]);
        let resolver = DuplicateResolver::new(&registry);

        let groups = resolver.find_all_duplicate_groups().unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].normalized_name, "audi rs6");
        assert_eq!(groups[1].summary(), "'bmw 4-series': 2 rows (#2, #5)");
    }

    #[test]
    fn test_single_entry_returns_itself() {
        let single = vec![VehicleRecord::new(1, "Audi RS6", CanonicalStatus::Good)];
        let picked = resolve_duplicates(&single, &ResolutionCriteria::prefer_older()).unwrap();
        assert_eq!(picked.id, 1);
        assert!(resolve_duplicates(&[], &ResolutionCriteria::default()).is_none());
    }

    #[test]
    fn test_preferred_status() {
        let picked = resolve_duplicates(
            &duplicate_set(),
            &ResolutionCriteria::preferred_status(CanonicalStatus::Poor),
        )
        .unwrap();
        assert_eq!(picked.id, 3);
    }

    #[test]
    fn test_preferred_status_without_match_falls_back_to_registry_order() {
        let set: Vec<VehicleRecord> = duplicate_set()
            .into_iter()
            .filter(|r| r.status != CanonicalStatus::Poor)
            .collect();

        let picked = resolve_duplicates(
            &set,
            &ResolutionCriteria::preferred_status(CanonicalStatus::Poor),
        )
        .unwrap();
        assert_eq!(picked.id, 7);
    }

    #[test]
    fn test_prefer_older() {
        let picked = resolve_duplicates(&duplicate_set(), &ResolutionCriteria::prefer_older()).unwrap();
        assert_eq!(picked.id, 3);
    }

    #[test]
    fn test_prefer_recent_maintenance() {
        let picked = resolve_duplicates(
            &duplicate_set(),
            &ResolutionCriteria::prefer_recent_maintenance(),
        )
        .unwrap();
        assert_eq!(picked.id, 9);
    }

    #[test]
    fn test_recent_maintenance_without_timestamps_uses_registry_order() {
        let set = vec![
            VehicleRecord::new(4, "Kia Rio", CanonicalStatus::Good),
            VehicleRecord::new(2, "kia rio", CanonicalStatus::Poor),
        ];
        let picked =
            resolve_duplicates(&set, &ResolutionCriteria::prefer_recent_maintenance()).unwrap();
        assert_eq!(picked.id, 4);
    }

    #[test]
    fn test_default_is_registry_order() {
        let picked = resolve_duplicates(&duplicate_set(), &ResolutionCriteria::default()).unwrap();
        assert_eq!(picked.id, 7);
    }
}
