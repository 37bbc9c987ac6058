//! The scrape-and-reconcile loop, written against narrow collaborator
//! traits. Collaborators are passed in by the caller; nothing here owns a
//! browser session, a spreadsheet handle or a clock.

use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use crate::classify::StatusClassifier;
use crate::config::RunOptions;
use crate::dedup::deduplicate;
use crate::engine::ReconciliationEngine;
use crate::error::{ReconError, StoreError};
use crate::model::{CanonicalStatus, DifferencesReport, FetchOutcome, ImportBatch, TrackingRecord};
use crate::summary::RunSummary;

/// Header label of the tracking-number column in the tracking sheet. A
/// stored row carrying it as a value is a stray header, not a shipment.
pub const TRACKING_HEADER: &str = "ID TRACKING";

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Yields the newest import batch. Returns `None` when there is none or it
/// could not be read; implementations log the reason.
pub trait SourceImporter {
    fn fetch_latest(&mut self) -> Option<ImportBatch>;
}

/// Looks up one tracking number on the carrier site. Implementations
/// translate their own failures into [`FetchOutcome::Failed`].
pub trait TrackingFetcher {
    fn fetch(&mut self, tracking_number: &str) -> FetchOutcome;
}

/// The tracking sheet plus the per-run differences artifacts.
pub trait RecordStore {
    fn load_existing(&mut self) -> Result<Vec<TrackingRecord>, StoreError>;

    /// Append records whose tracking number is not stored yet. Returns how
    /// many were added.
    fn append_new(&mut self, records: &[TrackingRecord]) -> Result<usize, StoreError>;

    fn write_result(
        &mut self,
        tracking_number: &str,
        observed: &CanonicalStatus,
        alert: bool,
    ) -> Result<(), StoreError>;

    fn write_differences_report(&mut self, report: &DifferencesReport) -> Result<(), StoreError>;
}

/// Wall clock and pacing.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
    fn pause(&self, duration: Duration);
}

/// Local time, real sleeps.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Everything a run needs, borrowed for its duration.
pub struct Pipeline<'a, I, S, F, C> {
    pub importer: &'a mut I,
    pub store: &'a mut S,
    pub fetcher: &'a mut F,
    pub clock: &'a C,
    pub classifier: &'a StatusClassifier,
}

impl<'a, I, S, F, C> Pipeline<'a, I, S, F, C>
where
    I: SourceImporter,
    S: RecordStore,
    F: TrackingFetcher,
    C: Clock,
{
    /// Import the newest batch, append unseen shipments, then reconcile every
    /// stored shipment against the carrier.
    ///
    /// Aborts only when no usable batch exists or the sheet can't be read.
    /// Per-record fetch and write failures are logged and counted.
    pub fn run(&mut self, options: &RunOptions) -> Result<RunSummary, ReconError> {
        let mut summary = RunSummary::default();

        if !options.skip_import {
            self.import(&mut summary)?;
        }

        let stored = self.store.load_existing().map_err(ReconError::StoreLoad)?;
        self.check_records(&stored, options, &mut summary);

        Ok(summary)
    }

    fn import(&mut self, summary: &mut RunSummary) -> Result<(), ReconError> {
        info!("looking for the latest import batch");
        let batch = self
            .importer
            .fetch_latest()
            .ok_or_else(|| ReconError::ImportUnavailable("no import batch found".into()))?;

        let records = deduplicate(&batch.rows);
        summary.batch_name = batch.name.clone();
        summary.imported_rows = batch.rows.len();
        summary.unique_records = records.len();
        info!(
            batch = %batch.name,
            rows = batch.rows.len(),
            unique = records.len(),
            "import batch processed"
        );

        if records.is_empty() {
            return Err(ReconError::ImportUnavailable(format!(
                "batch '{}' has no rows with a tracking number",
                batch.name
            )));
        }

        summary.appended = match self.store.append_new(&records) {
            Ok(0) => {
                info!("no new records to append");
                0
            }
            Ok(n) => {
                info!(appended = n, "appended new records to the tracking sheet");
                n
            }
            Err(e) => {
                error!(error = %e, "failed to append new records");
                0
            }
        };
        Ok(())
    }

    fn check_records(
        &mut self,
        stored: &[TrackingRecord],
        options: &RunOptions,
        summary: &mut RunSummary,
    ) {
        let mut engine = ReconciliationEngine::new();
        let candidates = stored
            .iter()
            .filter(|r| {
                let n = r.tracking_number.trim();
                !n.is_empty() && n != TRACKING_HEADER
            })
            .take(options.limit.unwrap_or(usize::MAX));

        for (i, record) in candidates.enumerate() {
            if i > 0 {
                self.clock.pause(options.pace);
            }

            let tracking_number = record.tracking_number.trim();
            let outcome = self.fetcher.fetch(tracking_number);
            let observed = observe(self.classifier, tracking_number, outcome, summary);
            let result = engine.compare(tracking_number, &record.internal_status, &observed);
            summary.record(&result);

            if let Err(e) = self.store.write_result(tracking_number, &observed, result.alert) {
                warn!(tracking_number, error = %e, "result not persisted");
                summary.store_write_failures += 1;
            }

            info!(
                tracking_number,
                internal = %record.internal_status,
                observed = %observed,
                alert = result.alert,
                "updated"
            );
        }

        match engine.finish(self.clock.now()) {
            Some(report) => {
                info!(differences = report.len(), "records differ from the carrier");
                match self.store.write_differences_report(&report) {
                    Ok(()) => {
                        info!(report = %report.name, "differences report written");
                        summary.report = Some(report.name.clone());
                    }
                    Err(e) => error!(report = %report.name, error = %e, "failed to write differences report"),
                }
            }
            None => info!("no differences between internal and carrier statuses"),
        }
    }
}

/// Turn a fetch outcome into a canonical status, counting failures.
fn observe(
    classifier: &StatusClassifier,
    tracking_number: &str,
    outcome: FetchOutcome,
    summary: &mut RunSummary,
) -> CanonicalStatus {
    match outcome {
        FetchOutcome::Text(raw) => {
            let status = classifier.classify(&raw);
            if let CanonicalStatus::Unknown(_) = status {
                debug!(tracking_number, raw = %raw, "status text matched no keyword group");
            }
            status
        }
        FetchOutcome::NotFound => CanonicalStatus::NotFound,
        FetchOutcome::Failed { cause } => {
            warn!(tracking_number, %cause, "fetch failed");
            summary.fetch_failures += 1;
            CanonicalStatus::Error
        }
    }
}
