use chrono::NaiveDateTime;

use crate::model::{CanonicalStatus, DifferencesReport, ReconciliationResult};

/// Internal status that means the business already recorded the delivery.
pub const DELIVERED_INTERNAL: &str = "ENTREGADO";

/// Compare an internal status against an observed one.
///
/// `is_different` is a case-insensitive comparison of the trimmed internal
/// status against the observed status' display string, not a comparison of
/// taxonomies. An internal "En Tránsito" therefore equals an observed
/// `InTransit`, but an internal "EN CAMINO" does not, and an `Unknown`
/// observation equal to the internal text counts as not different.
///
/// `alert` upper-cases the internal status without trimming it, so a padded
/// " ENTREGADO " still alerts on an observed delivery.
pub fn reconcile(
    tracking_number: &str,
    internal_status: &str,
    observed: &CanonicalStatus,
) -> ReconciliationResult {
    let is_different = internal_status.trim().to_uppercase() != observed.display().to_uppercase();
    let alert = *observed == CanonicalStatus::Delivered
        && internal_status.to_uppercase() != DELIVERED_INTERNAL;

    ReconciliationResult {
        tracking_number: tracking_number.to_string(),
        internal_status: internal_status.to_string(),
        observed: observed.clone(),
        is_different,
        alert,
    }
}

/// Reconciles records one at a time and keeps every difference for the
/// run's report.
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    differences: Vec<ReconciliationResult>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compare(
        &mut self,
        tracking_number: &str,
        internal_status: &str,
        observed: &CanonicalStatus,
    ) -> ReconciliationResult {
        let result = reconcile(tracking_number, internal_status, observed);
        if result.is_different {
            self.differences.push(result.clone());
        }
        result
    }

    /// Close the run. Returns `None` when nothing differed.
    pub fn finish(self, run_at: NaiveDateTime) -> Option<DifferencesReport> {
        if self.differences.is_empty() {
            None
        } else {
            Some(DifferencesReport::new(run_at, self.differences))
        }
    }
}
