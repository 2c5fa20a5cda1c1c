// 📦 Batch Processor - apply a list of status updates, one item at a time
//
// Each request is resolved, validated and written independently. A failure
// (bad input, unknown vehicle, registry I/O) is recorded against that item
// and processing moves on. The report is folded over the request list.

use crate::config::FleetConfig;
use crate::duplicates::{resolve_duplicates, ResolutionCriteria};
use crate::error::{validate_vehicle_name, FailureKind, UpdateError};
use crate::matching::{MatchType, VehicleResolver, MAX_ALTERNATIVES};
use crate::registry::{AuditLog, VehicleRecord, VehicleRegistry};
use crate::status::{CanonicalStatus, StatusNormalizer};
use crate::validation::{TransitionKind, TransitionValidator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

// ============================================================================
// REQUEST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub vehicle_name: String,
    pub status: String,
}

impl StatusUpdateRequest {
    pub fn new(vehicle_name: &str, status: &str) -> Self {
        StatusUpdateRequest {
            vehicle_name: vehicle_name.to_string(),
            status: status.to_string(),
        }
    }
}

// ============================================================================
// ITEM OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedItem {
    pub vehicle_name: String,
    pub vehicle_id: i64,
    pub matched_name: String,
    pub match_type: MatchType,
    pub confidence: f64,

    /// Row the name matched, when duplicate criteria picked this one instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<i64>,

    pub old_status: CanonicalStatus,
    pub new_status: CanonicalStatus,
    pub transition: TransitionKind,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnchangedItem {
    pub vehicle_name: String,
    pub vehicle_id: i64,
    pub matched_name: String,
    pub match_type: MatchType,
    pub confidence: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<i64>,

    pub status: CanonicalStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedItem {
    pub vehicle_name: String,
    pub raw_status: String,
    pub kind: FailureKind,
    pub reason: String,

    /// Up to three alternate names
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemOutcome {
    Updated(UpdatedItem),
    Unchanged(UnchangedItem),
    Failed(FailedItem),
}

// ============================================================================
// BATCH REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Length of the submitted request list
    pub requested: usize,

    /// Items actually attempted
    pub total: usize,

    pub updated: Vec<UpdatedItem>,
    pub unchanged: Vec<UnchangedItem>,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    pub fn start(source: &str, requested: usize) -> Self {
        BatchReport {
            batch_id: uuid::Uuid::new_v4().to_string(),
            source: source.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            requested,
            total: 0,
            updated: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Fold step: a new report with one more outcome
    pub fn record(self, outcome: ItemOutcome) -> Self {
        let mut next = self;
        next.total += 1;
        match outcome {
            ItemOutcome::Updated(item) => next.updated.push(item),
            ItemOutcome::Unchanged(item) => next.unchanged.push(item),
            ItemOutcome::Failed(item) => next.failed.push(item),
        }
        next
    }

    pub fn finish(self) -> Self {
        BatchReport {
            finished_at: Some(Utc::now()),
            ..self
        }
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn unchanged_count(&self) -> usize {
        self.unchanged.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// updated + unchanged + failed == total
    pub fn is_consistent(&self) -> bool {
        self.updated_count() + self.unchanged_count() + self.failed_count() == self.total
    }

    /// True when the caller stopped before the end of the list
    pub fn is_partial(&self) -> bool {
        self.total < self.requested
    }

    pub fn summary(&self) -> String {
        format!(
            "{} items: {} updated, {} unchanged, {} failed",
            self.total,
            self.updated_count(),
            self.unchanged_count(),
            self.failed_count()
        )
    }
}

// ============================================================================
// BATCH PROCESSOR
// ============================================================================

pub struct BatchProcessor<'a, R: VehicleRegistry + ?Sized, A: AuditLog + ?Sized> {
    registry: &'a R,
    audit: &'a A,
    resolver: VehicleResolver<'a, R>,
    statuses: StatusNormalizer,
    validator: TransitionValidator,
    criteria: ResolutionCriteria,
    max_name_length: usize,
    max_suggestions: usize,
}

impl<'a, R: VehicleRegistry + ?Sized, A: AuditLog + ?Sized> BatchProcessor<'a, R, A> {
    /// Processor with default matching, status and maintenance settings
    pub fn new(registry: &'a R, audit: &'a A) -> Self {
        Self::with_config(registry, audit, &FleetConfig::default())
    }

    pub fn with_config(registry: &'a R, audit: &'a A, config: &FleetConfig) -> Self {
        BatchProcessor {
            registry,
            audit,
            resolver: VehicleResolver::with_config(registry, config.matching.clone()),
            statuses: config.statuses.normalizer(),
            validator: TransitionValidator::with_config(config.maintenance.clone()),
            criteria: config.duplicates.criteria(),
            max_name_length: config.matching.max_name_length,
            max_suggestions: config.matching.max_alternatives.min(MAX_ALTERNATIVES),
        }
    }

    /// Row to update when a name matches several registry rows
    pub fn with_duplicate_criteria(mut self, criteria: ResolutionCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Process every request in order
    pub fn process_batch(&self, requests: &[StatusUpdateRequest], source: &str) -> BatchReport {
        self.process_batch_while(requests, source, |_| true)
    }

    /// Process requests in order while `keep_going` returns true
    ///
    /// `keep_going` sees the report so far before each item; the returned
    /// report only counts attempted items.
    pub fn process_batch_while<F>(
        &self,
        requests: &[StatusUpdateRequest],
        source: &str,
        mut keep_going: F,
    ) -> BatchReport
    where
        F: FnMut(&BatchReport) -> bool,
    {
        let start = BatchReport::start(source, requests.len());
        info!(batch_id = %start.batch_id, total = requests.len(), source, "batch started");
        if let Err(e) = self
            .audit
            .log_batch_start(&start.batch_id, requests.len(), source)
        {
            warn!(error = %e, "audit log failed (batch start)");
        }

        let folded = requests.iter().try_fold(start, |report, request| {
            if !keep_going(&report) {
                return ControlFlow::Break(report);
            }
            let outcome = self.process_item(&report.batch_id, request);
            ControlFlow::Continue(report.record(outcome))
        });

        let report = match folded {
            ControlFlow::Continue(report) | ControlFlow::Break(report) => report.finish(),
        };

        info!(batch_id = %report.batch_id, "{}", report.summary());
        if let Err(e) = self.audit.log_batch_complete(&report) {
            warn!(error = %e, "audit log failed (batch complete)");
        }

        report
    }

    /// Resolve → validate → write for one request; never fails the batch
    fn process_item(&self, batch_id: &str, request: &StatusUpdateRequest) -> ItemOutcome {
        match self.apply(request) {
            Ok(outcome) => {
                if let ItemOutcome::Updated(item) = &outcome {
                    if let Err(e) = self.audit.log_status_update(batch_id, item) {
                        warn!(error = %e, "audit log failed (status update)");
                    }
                }
                outcome
            }
            Err(error) => {
                warn!(
                    vehicle = %request.vehicle_name,
                    kind = error.kind().as_str(),
                    "update failed: {}",
                    error
                );
                let reason = error.to_string();
                if let Err(e) = self.audit.log_status_update_error(batch_id, request, &reason) {
                    warn!(error = %e, "audit log failed (status update error)");
                }

                let mut suggestions = error.suggestions().to_vec();
                suggestions.truncate(self.max_suggestions);

                ItemOutcome::Failed(FailedItem {
                    vehicle_name: request.vehicle_name.clone(),
                    raw_status: request.status.clone(),
                    kind: error.kind(),
                    reason,
                    suggestions,
                })
            }
        }
    }

    fn apply(&self, request: &StatusUpdateRequest) -> Result<ItemOutcome, UpdateError> {
        let name = validate_vehicle_name(&request.vehicle_name, self.max_name_length)?;

        let matched = self.resolver.resolve(name)?;
        let record = match (&matched.record, matched.found) {
            (Some(record), true) => record.clone(),
            _ => {
                return Err(UpdateError::NotFound {
                    suggestions: matched.suggestion_names(),
                })
            }
        };
        let (record, duplicate_of) = self.pick_row(record, &matched.duplicates);
        let match_type = match duplicate_of {
            Some(_) => MatchType::Duplicate,
            None => matched.match_type,
        };

        let new_status = self.statuses.normalize(&request.status)?;

        if new_status == record.status {
            return Ok(ItemOutcome::Unchanged(UnchangedItem {
                vehicle_name: request.vehicle_name.clone(),
                vehicle_id: record.id,
                matched_name: record.name,
                match_type,
                confidence: matched.confidence,
                duplicate_of,
                status: new_status,
            }));
        }

        let validation = self.validator.validate_update(&record, new_status);
        if validation.is_blocked() {
            return Err(UpdateError::Transition(validation.errors.join("; ")));
        }

        let written = self.registry.update_status(record.id, new_status)?;

        Ok(ItemOutcome::Updated(UpdatedItem {
            vehicle_name: request.vehicle_name.clone(),
            vehicle_id: written.id,
            matched_name: written.name,
            match_type,
            confidence: matched.confidence,
            duplicate_of,
            old_status: record.status,
            new_status: written.status,
            transition: validation.transition,
            warnings: validation.warnings,
            recommendations: validation.recommendations,
        }))
    }

    /// Row to write, plus the matched id when duplicate criteria chose another row
    fn pick_row(
        &self,
        matched: VehicleRecord,
        duplicates: &[VehicleRecord],
    ) -> (VehicleRecord, Option<i64>) {
        if duplicates.len() < 2 || self.criteria == ResolutionCriteria::default() {
            return (matched, None);
        }

        // Matched row first: a criterion that decides nothing keeps it
        let ordered: Vec<VehicleRecord> = std::iter::once(matched.clone())
            .chain(duplicates.iter().filter(|v| v.id != matched.id).cloned())
            .collect();

        match resolve_duplicates(&ordered, &self.criteria) {
            Some(picked) if picked.id != matched.id => {
                debug!(matched = matched.id, picked = picked.id, "duplicate row picked");
                (picked, Some(matched.id))
            }
            _ => (matched, None),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
