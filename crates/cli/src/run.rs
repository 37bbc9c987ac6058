//! `shiptrack run`: wire the file-backed collaborators and the carrier
//! fetcher into the reconciliation pipeline.

use std::time::Duration;

use shiptrack_config::Settings;
use shiptrack_io::{CsvSheetStore, FolderImporter, ReportFormat};
use shiptrack_recon::{
    CanonicalStatus, Pipeline, ReconError, RunOptions, RunSummary, StatusClassifier, SystemClock,
};
use tracing::{info, warn};

use crate::exit_codes::{EXIT_CONFIG, EXIT_DIFFERENCES, EXIT_STORE};
use crate::fetch::HttpTrackingFetcher;
use crate::CliError;

/// Default keyword groups plus any `extra_keywords` from settings.
pub fn classifier_for(settings: &Settings) -> StatusClassifier {
    let mut classifier = StatusClassifier::default();
    for (group, words) in &settings.extra_keywords {
        match CanonicalStatus::from_group_key(group) {
            Some(status) => classifier.extend(status, words),
            None => warn!(group = %group, "ignoring keywords for unknown status group"),
        }
    }
    classifier
}

pub fn cmd_run(settings: &Settings, no_import: bool, json: bool, fail_on_diff: bool) -> Result<(), CliError> {
    let format: ReportFormat = settings.report_format.parse().map_err(|e: String| CliError {
        code: EXIT_CONFIG,
        message: e,
        hint: None,
    })?;

    let mut store = CsvSheetStore::open(&settings.store_dir, format).map_err(|e| CliError {
        code: EXIT_STORE,
        message: format!("cannot open tracking sheet in {}: {e}", settings.store_dir.display()),
        hint: Some("fix or move tracking.csv; required columns: ID DROPI, ID TRACKING, STATUS DROPI".into()),
    })?;
    let mut importer = FolderImporter::new(&settings.source_dir);
    let mut fetcher = HttpTrackingFetcher::new(settings)
        .map_err(|e| CliError::recon(ReconError::CollaboratorInit(e)))?;
    let classifier = classifier_for(settings);

    let options = RunOptions {
        skip_import: no_import,
        ..RunOptions::default()
            .with_pace(Duration::from_secs(settings.pace_secs))
            .with_limit(settings.limit)
    };

    info!(
        source = %settings.source_dir.display(),
        store = %settings.store_dir.display(),
        skip_import = no_import,
        "starting run"
    );

    let summary = Pipeline {
        importer: &mut importer,
        store: &mut store,
        fetcher: &mut fetcher,
        clock: &SystemClock,
        classifier: &classifier,
    }
    .run(&options)
    .map_err(CliError::recon)?;

    print_summary(&summary);
    if json {
        let out = serde_json::to_string_pretty(&summary).map_err(|e| CliError::usage(e.to_string()))?;
        println!("{out}");
    }

    if fail_on_diff && summary.differences > 0 {
        return Err(CliError {
            code: EXIT_DIFFERENCES,
            message: format!("{} shipment(s) differ from the carrier", summary.differences),
            hint: summary
                .report
                .as_ref()
                .map(|r| format!("see {}", settings.store_dir.join(r).display())),
        });
    }
    Ok(())
}

fn print_summary(s: &RunSummary) {
    if !s.batch_name.is_empty() {
        eprintln!(
            "batch:       {} ({} rows, {} unique, {} new)",
            s.batch_name, s.imported_rows, s.unique_records, s.appended
        );
    }
    eprintln!("checked:     {}", s.checked);
    eprintln!("differences: {} ({} delivery alerts)", s.differences, s.alerts);
    if s.fetch_failures > 0 || s.store_write_failures > 0 {
        eprintln!(
            "failures:    {} lookups, {} sheet writes",
            s.fetch_failures, s.store_write_failures
        );
    }
    if let Some(report) = &s.report {
        eprintln!("report:      {report}");
    }
}
