//! Tracking sheet kept as a CSV file in the store directory, plus one
//! differences artifact per run next to it.
//!
//! Columns are located by header name when the sheet is opened, so a sheet
//! edited by hand (reordered or extra columns) still loads. The observed
//! status and alert columns are added if an older sheet lacks them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use shiptrack_recon::{CanonicalStatus, DifferencesReport, RecordStore, StoreError, TrackingRecord};
use tracing::debug;

pub const SHEET_FILE: &str = "tracking.csv";

pub const COL_SOURCE_ID: &str = "ID DROPI";
pub const COL_TRACKING: &str = "ID TRACKING";
pub const COL_INTERNAL: &str = "STATUS DROPI";
pub const COL_OBSERVED: &str = "STATUS TRACKING";
pub const COL_ALERT: &str = "Alerta";

pub const REPORT_HEADERS: [&str; 4] =
    [COL_TRACKING, COL_INTERNAL, COL_OBSERVED, "FECHA VERIFICACIÓN"];

/// File format of the per-run differences artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            other => Err(format!("unknown report format '{other}' (expected csv or xlsx)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetRow {
    record: TrackingRecord,
    observed: String,
    alert: String,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    source_id: usize,
    tracking: usize,
    internal: usize,
    observed: usize,
    alert: usize,
}

/// CSV-backed [`RecordStore`].
pub struct CsvSheetStore {
    dir: PathBuf,
    header: Vec<String>,
    cols: Columns,
    /// Full sheet rows (minus header) as read, with our columns kept in sync.
    rows: Vec<Vec<String>>,
    report_format: ReportFormat,
}

impl CsvSheetStore {
    /// Open (or create) the tracking sheet in `dir`.
    pub fn open(dir: impl Into<PathBuf>, report_format: ReportFormat) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(SHEET_FILE);

        let mut table = if path.exists() {
            crate::csv::read_table(&path).map_err(StoreError::Io)?
        } else {
            Vec::new()
        };

        let mut header = if table.is_empty() {
            default_header()
        } else {
            table.remove(0)
        };
        let cols = resolve_columns(&mut header)?;

        let width = header.len();
        let rows = table
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .map(|mut r| {
                r.resize(width.max(r.len()), String::new());
                r
            })
            .collect();

        let store = Self { dir, header, cols, rows, report_format };
        if !path.exists() {
            store.persist()?;
        }
        Ok(store)
    }

    pub fn sheet_path(&self) -> PathBuf {
        self.dir.join(SHEET_FILE)
    }

    fn record_at(&self, row: &[String]) -> SheetRow {
        let get = |i: usize| row.get(i).cloned().unwrap_or_default();
        SheetRow {
            record: TrackingRecord {
                source_id: get(self.cols.source_id),
                tracking_number: get(self.cols.tracking).trim().to_string(),
                internal_status: get(self.cols.internal),
            },
            observed: get(self.cols.observed),
            alert: get(self.cols.alert),
        }
    }

    /// Observed status and alert flag last written for a tracking number.
    pub fn result_for(&self, tracking_number: &str) -> Option<(String, bool)> {
        self.rows
            .iter()
            .map(|r| self.record_at(r))
            .find(|r| r.record.tracking_number == tracking_number)
            .map(|r| (r.observed, r.alert.eq_ignore_ascii_case("TRUE")))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let mut table = Vec::with_capacity(self.rows.len() + 1);
        table.push(self.header.clone());
        table.extend(self.rows.iter().cloned());
        crate::csv::write_table(&self.sheet_path(), &table).map_err(StoreError::Io)
    }

    /// Path for a report, suffixed when a run in the same minute already
    /// wrote one.
    fn report_path(&self, name: &str) -> PathBuf {
        let ext = self.report_format.extension();
        let mut path = self.dir.join(format!("{name}.{ext}"));
        let mut n = 2;
        while path.exists() {
            path = self.dir.join(format!("{name}_{n}.{ext}"));
            n += 1;
        }
        path
    }
}

fn default_header() -> Vec<String> {
    [COL_SOURCE_ID, COL_TRACKING, COL_INTERNAL, COL_OBSERVED, COL_ALERT]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Locate columns by trimmed header text. The first three are required;
/// the result columns are appended when missing.
fn resolve_columns(header: &mut Vec<String>) -> Result<Columns, StoreError> {
    let find = |header: &[String], name: &str| header.iter().position(|h| h.trim() == name);

    let required = |header: &[String], name: &str| {
        find(header, name)
            .ok_or_else(|| StoreError::Malformed(format!("tracking sheet has no '{name}' column")))
    };
    let source_id = required(header.as_slice(), COL_SOURCE_ID)?;
    let tracking = required(header.as_slice(), COL_TRACKING)?;
    let internal = required(header.as_slice(), COL_INTERNAL)?;

    let mut ensure = |name: &str| match find(header.as_slice(), name) {
        Some(i) => i,
        None => {
            header.push(name.to_string());
            header.len() - 1
        }
    };
    let observed = ensure(COL_OBSERVED);
    let alert = ensure(COL_ALERT);

    Ok(Columns { source_id, tracking, internal, observed, alert })
}

impl RecordStore for CsvSheetStore {
    fn load_existing(&mut self) -> Result<Vec<TrackingRecord>, StoreError> {
        Ok(self.rows.iter().map(|r| self.record_at(r).record).collect())
    }

    fn append_new(&mut self, records: &[TrackingRecord]) -> Result<usize, StoreError> {
        let existing = self.load_existing()?;
        let fresh = shiptrack_recon::dedup::new_records(&existing, records);
        if fresh.is_empty() {
            return Ok(0);
        }

        let width = self.header.len();
        let before = self.rows.len();
        for record in &fresh {
            let mut row = vec![String::new(); width];
            row[self.cols.source_id] = record.source_id.clone();
            row[self.cols.tracking] = record.tracking_number.clone();
            row[self.cols.internal] = record.internal_status.clone();
            row[self.cols.alert] = "FALSE".into();
            self.rows.push(row);
        }
        if let Err(e) = self.persist() {
            self.rows.truncate(before);
            return Err(e);
        }
        Ok(fresh.len())
    }

    fn write_result(
        &mut self,
        tracking_number: &str,
        observed: &CanonicalStatus,
        alert: bool,
    ) -> Result<(), StoreError> {
        let cols = self.cols;
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.get(cols.tracking).map(|s| s.trim()) == Some(tracking_number))
            .ok_or_else(|| StoreError::UnknownTrackingNumber(tracking_number.to_string()))?;

        row[cols.observed] = observed.display().to_string();
        row[cols.alert] = if alert { "TRUE" } else { "FALSE" }.to_string();
        self.persist()
    }

    fn write_differences_report(&mut self, report: &DifferencesReport) -> Result<(), StoreError> {
        let checked_at = report.checked_at();
        let mut table = vec![REPORT_HEADERS.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
        table.extend(report.entries.iter().map(|e| {
            vec![
                e.tracking_number.clone(),
                e.internal_status.clone(),
                e.observed.display().to_string(),
                checked_at.clone(),
            ]
        }));

        let path = self.report_path(&report.name);
        debug!(path = %path.display(), rows = report.len(), "writing differences report");
        match self.report_format {
            ReportFormat::Csv => crate::csv::write_table(&path, &table),
            ReportFormat::Xlsx => crate::xlsx::write_sheet(&path, &report.name, &table),
        }
        .map_err(StoreError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shiptrack_recon::reconcile;

    fn rec(id: &str, guia: &str, status: &str) -> TrackingRecord {
        TrackingRecord {
            source_id: id.into(),
            tracking_number: guia.into(),
            internal_status: status.into(),
        }
    }

    #[test]
    fn creates_sheet_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(store.sheet_path()).unwrap();
        assert_eq!(text.trim(), "ID DROPI,ID TRACKING,STATUS DROPI,STATUS TRACKING,Alerta");
    }

    #[test]
    fn append_skips_known_numbers_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        assert_eq!(store.append_new(&[rec("A1", "1", "PENDIENTE"), rec("A2", "2", "ENTREGADO")]).unwrap(), 2);
        assert_eq!(store.append_new(&[rec("A3", "2", "X"), rec("A4", "3", "Y")]).unwrap(), 1);

        let mut reopened = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        let records = reopened.load_existing().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], rec("A2", "2", "ENTREGADO"));
        assert_eq!(reopened.result_for("3"), Some((String::new(), false)));
    }

    #[test]
    fn failed_append_leaves_rows_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        store.append_new(&[rec("A1", "1", "PENDIENTE")]).unwrap();

        // a directory where the temp sheet goes makes the write fail
        std::fs::create_dir(dir.path().join("tracking.csv.tmp")).unwrap();
        assert!(store.append_new(&[rec("A2", "2", "ENTREGADO")]).is_err());
        assert_eq!(store.load_existing().unwrap(), vec![rec("A1", "1", "PENDIENTE")]);
        assert_eq!(store.result_for("2"), None);

        std::fs::remove_dir(dir.path().join("tracking.csv.tmp")).unwrap();
        assert_eq!(store.append_new(&[rec("A2", "2", "ENTREGADO")]).unwrap(), 1);
        assert_eq!(store.load_existing().unwrap().len(), 2);
    }

    #[test]
    fn write_result_updates_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        store.append_new(&[rec("A1", "1", "PENDIENTE")]).unwrap();
        store.write_result("1", &CanonicalStatus::Delivered, true).unwrap();

        let reopened = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        assert_eq!(reopened.result_for("1"), Some(("ENTREGADO".to_string(), true)));
    }

    #[test]
    fn write_result_for_unknown_number_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        let err = store.write_result("404", &CanonicalStatus::Pending, false).unwrap_err();
        assert!(matches!(err, StoreError::UnknownTrackingNumber(_)));
    }

    #[test]
    fn hand_edited_sheet_with_reordered_columns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SHEET_FILE),
            "NOTAS,ID TRACKING,STATUS DROPI,ID DROPI\nllamar,77,PENDIENTE,A9\n",
        )
        .unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        assert_eq!(store.load_existing().unwrap(), vec![rec("A9", "77", "PENDIENTE")]);

        store.write_result("77", &CanonicalStatus::InTransit, false).unwrap();
        let text = std::fs::read_to_string(dir.path().join(SHEET_FILE)).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("NOTAS,ID TRACKING,STATUS DROPI,ID DROPI,STATUS TRACKING,Alerta")
        );
        assert_eq!(lines.next(), Some("llamar,77,PENDIENTE,A9,EN TRÁNSITO,FALSE"));
    }

    #[test]
    fn sheet_missing_required_column_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SHEET_FILE), "ID DROPI,STATUS DROPI\n").unwrap();
        let err = CsvSheetStore::open(dir.path(), ReportFormat::Csv).err().unwrap();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn reports_are_dated_and_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Csv).unwrap();
        let at = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(7, 45, 12).unwrap();
        let report = DifferencesReport::new(
            at,
            vec![reconcile("999", "PENDIENTE", &CanonicalStatus::Delivered)],
        );

        store.write_differences_report(&report).unwrap();
        store.write_differences_report(&report).unwrap();

        let first = dir.path().join("Diferencias_2026-10-19_07-45.csv");
        let second = dir.path().join("Diferencias_2026-10-19_07-45_2.csv");
        assert!(second.exists());
        let text = std::fs::read_to_string(first).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("ID TRACKING,STATUS DROPI,STATUS TRACKING,FECHA VERIFICACIÓN")
        );
        assert_eq!(lines.next(), Some("999,PENDIENTE,ENTREGADO,2026-10-19 07:45:12"));
    }

    #[test]
    fn xlsx_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvSheetStore::open(dir.path(), ReportFormat::Xlsx).unwrap();
        let at = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let report = DifferencesReport::new(
            at,
            vec![reconcile("5", "ENTREGADO", &CanonicalStatus::Returned)],
        );
        store.write_differences_report(&report).unwrap();

        let table = crate::xlsx::read_first_sheet(&dir.path().join("Diferencias_2026-01-01_00-00.xlsx")).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[1][2], "DEVUELTO");
    }

    #[test]
    fn report_format_parses() {
        assert_eq!("XLSX".parse::<ReportFormat>().unwrap(), ReportFormat::Xlsx);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }
}
