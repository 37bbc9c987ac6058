use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::ReconciliationResult;

/// Counters for one run, printed by the CLI and emitted with `--json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub batch_name: String,
    pub imported_rows: usize,
    pub unique_records: usize,
    pub appended: usize,
    pub checked: usize,
    pub differences: usize,
    pub alerts: usize,
    pub fetch_failures: usize,
    pub store_write_failures: usize,
    /// Name of the differences artifact, when one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    pub status_counts: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn record(&mut self, result: &ReconciliationResult) {
        self.checked += 1;
        *self.status_counts.entry(result.observed.key().to_string()).or_insert(0) += 1;
        if result.is_different {
            self.differences += 1;
        }
        if result.alert {
            self.alerts += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconcile;
    use crate::model::CanonicalStatus;

    #[test]
    fn summary_counts() {
        let mut s = RunSummary::default();
        s.record(&reconcile("1", "ENTREGADO", &CanonicalStatus::Delivered));
        s.record(&reconcile("2", "PENDIENTE", &CanonicalStatus::Delivered));
        s.record(&reconcile("3", "PENDIENTE", &CanonicalStatus::Pending));
        s.record(&reconcile("4", "PENDIENTE", &CanonicalStatus::Unknown("x".into())));

        assert_eq!(s.checked, 4);
        assert_eq!(s.differences, 2);
        assert_eq!(s.alerts, 1);
        assert_eq!(s.status_counts["delivered"], 2);
        assert_eq!(s.status_counts["pending"], 1);
        assert_eq!(s.status_counts["unknown"], 1);
    }
}
