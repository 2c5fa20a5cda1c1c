// 🧾 Report rendering - human-readable batch output

use crate::batch::BatchReport;
use std::fmt::Write;

/// Render a batch report as plain text
pub fn render_text(report: &BatchReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Batch {} ({})", report.batch_id, report.source);
    let _ = writeln!(out, "Started:  {}", report.started_at.to_rfc3339());
    if let Some(finished) = report.finished_at {
        let _ = writeln!(out, "Finished: {}", finished.to_rfc3339());
    }
    let _ = writeln!(out, "{}", report.summary());
    if report.is_partial() {
        let _ = writeln!(
            out,
            "Stopped early: {} of {} requests attempted",
            report.total, report.requested
        );
    }

    if !report.updated.is_empty() {
        let _ = writeln!(out, "\nUpdated:");
        for item in &report.updated {
            let _ = writeln!(
                out,
                "  ✓ {} → {} (#{}): {} → {} [{}, {:.0}%]",
                item.vehicle_name,
                item.matched_name,
                item.vehicle_id,
                item.old_status,
                item.new_status,
                item.match_type.as_str(),
                item.confidence * 100.0
            );
            if let Some(matched) = item.duplicate_of {
                let _ = writeln!(out, "      duplicate name: picked over #{}", matched);
            }
            for warning in &item.warnings {
                let _ = writeln!(out, "      ⚠ {}", warning);
            }
            for recommendation in &item.recommendations {
                let _ = writeln!(out, "      → {}", recommendation);
            }
        }
    }

    if !report.unchanged.is_empty() {
        let _ = writeln!(out, "\nUnchanged:");
        for item in &report.unchanged {
            let _ = writeln!(
                out,
                "  = {} → {} (#{}): already {}",
                item.vehicle_name, item.matched_name, item.vehicle_id, item.status
            );
        }
    }

    if !report.failed.is_empty() {
        let _ = writeln!(out, "\nFailed:");
        for item in &report.failed {
            let _ = writeln!(out, "  ✗ '{}' ({}): {}", item.vehicle_name, item.raw_status, item.reason);
            if !item.suggestions.is_empty() {
                let _ = writeln!(out, "      did you mean: {}", item.suggestions.join(", "));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchProcessor, StatusUpdateRequest};
    use crate::registry::{InMemoryRegistry, NullAudit};
    use crate::status::CanonicalStatus;

    #[test]
    fn test_render_text_lists_every_section() {
        let registry = InMemoryRegistry::from_vehicles(&[
            ("Porsche Cayenne", CanonicalStatus::Good),
            ("Audi RS6", CanonicalStatus::Average),
        ]);
        let processor = BatchProcessor::new(&registry, &NullAudit);

        let report = processor.process_batch(
            &[
                StatusUpdateRequest::new("Porsche Cayenne", "poor"),
                StatusUpdateRequest::new("Audi RS6", "average"),
                StatusUpdateRequest::new("Porsche Panamera", "good"),
            ],
            "test",
        );
        let text = render_text(&report);

        assert!(text.contains("3 items: 1 updated, 1 unchanged, 1 failed"));
        assert!(text.contains("good → poor"));
        assert!(text.contains("already average"));
        assert!(text.contains("'Porsche Panamera' (good): vehicle not found"));
        assert!(text.contains("did you mean: Porsche Cayenne"));
    }
}
