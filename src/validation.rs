// ✅ Transition Validator - is this status change plausible?
//
// Every transition is currently permitted; the validator classifies the
// change and attaches advisory warnings/recommendations drawn from the
// vehicle's maintenance history. Only `errors` block an update.

use crate::config::MaintenanceConfig;
use crate::registry::VehicleRecord;
use crate::status::CanonicalStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// TRANSITION CHECK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionCheck {
    pub is_valid: bool,
    pub is_no_change: bool,
    pub is_upgrade: bool,
    pub is_downgrade: bool,
    pub warning: Option<String>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Upgrade,
    Downgrade,
    NoChange,
}

impl TransitionCheck {
    pub fn kind(&self) -> TransitionKind {
        if self.is_upgrade {
            TransitionKind::Upgrade
        } else if self.is_downgrade {
            TransitionKind::Downgrade
        } else {
            TransitionKind::NoChange
        }
    }
}

// ============================================================================
// MAINTENANCE CHECK
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceCheck {
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

// ============================================================================
// VALIDATION OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Status the update would write
    pub status: CanonicalStatus,

    /// Blocking problems
    pub errors: Vec<String>,

    /// Advisory only
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,

    pub transition: TransitionKind,
}

impl ValidationOutcome {
    pub fn is_blocked(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ============================================================================
// TRANSITION VALIDATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransitionValidator {
    config: MaintenanceConfig,
}

impl TransitionValidator {
    pub fn new() -> Self {
        TransitionValidator::default()
    }

    pub fn with_config(config: MaintenanceConfig) -> Self {
        TransitionValidator { config }
    }

    /// Classify a status change
    pub fn validate_transition(
        &self,
        old_status: CanonicalStatus,
        new_status: CanonicalStatus,
    ) -> TransitionCheck {
        if old_status == new_status {
            return TransitionCheck {
                is_valid: true,
                is_no_change: true,
                is_upgrade: false,
                is_downgrade: false,
                warning: Some(format!("status unchanged ({})", old_status)),
                recommendation: None,
            };
        }

        let is_upgrade = new_status.rank() > old_status.rank();
        let drop = old_status.rank().saturating_sub(new_status.rank());

        let warning = (drop >= 2).then(|| {
            format!(
                "sharp condition drop: {} → {}; confirm the report",
                old_status, new_status
            )
        });

        let recommendation = (!is_upgrade && new_status == CanonicalStatus::Poor)
            .then(|| "schedule maintenance for this vehicle".to_string());

        TransitionCheck {
            is_valid: true,
            is_no_change: false,
            is_upgrade,
            is_downgrade: !is_upgrade,
            warning,
            recommendation,
        }
    }

    /// Advisory checks against the vehicle's last service date
    pub fn validate_maintenance_history(
        &self,
        record: &VehicleRecord,
        new_status: CanonicalStatus,
    ) -> MaintenanceCheck {
        self.validate_maintenance_history_at(record, new_status, Utc::now())
    }

    pub fn validate_maintenance_history_at(
        &self,
        record: &VehicleRecord,
        new_status: CanonicalStatus,
        now: DateTime<Utc>,
    ) -> MaintenanceCheck {
        let mut check = MaintenanceCheck::default();

        let last = match record.last_maintenance {
            Some(last) => last,
            None => {
                check
                    .warnings
                    .push("no maintenance date on record".to_string());
                check
                    .recommendations
                    .push("record the date of the last service".to_string());
                return check;
            }
        };

        let days_since = (now - last).num_days();

        if new_status == CanonicalStatus::Good && days_since > self.config.good_stale_after_days {
            check.warnings.push(format!(
                "'good' reported {} days after the last service (limit {})",
                days_since, self.config.good_stale_after_days
            ));
            check
                .recommendations
                .push("schedule a routine inspection".to_string());
        }

        if new_status == CanonicalStatus::Poor && days_since < self.config.poor_fresh_within_days {
            check.warnings.push(format!(
                "'poor' reported only {} days after a service",
                days_since
            ));
            check
                .recommendations
                .push("check the quality of the last service".to_string());
        }

        check
    }

    /// Full pre-write check for moving `record` to `new_status`
    pub fn validate_update(
        &self,
        record: &VehicleRecord,
        new_status: CanonicalStatus,
    ) -> ValidationOutcome {
        let transition = self.validate_transition(record.status, new_status);
        let history = self.validate_maintenance_history(record, new_status);

        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();

        if !transition.is_valid {
            errors.push(format!(
                "transition {} → {} is not permitted",
                record.status, new_status
            ));
        }
        warnings.extend(transition.warning.clone());
        recommendations.extend(transition.recommendation.clone());
        warnings.extend(history.warnings);
        recommendations.extend(history.recommendations);

        ValidationOutcome {
            status: new_status,
            errors,
            warnings,
            recommendations,
            transition: transition.kind(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
