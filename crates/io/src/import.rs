//! Import batches: tabular files with an identifier, a tracking number and
//! an internal status column.
//!
//! Headers are matched after trimming and upper-casing. All three required
//! headers must be present; a missing one rejects the whole file rather than
//! silently reading the wrong column.

use std::fmt;
use std::path::Path;

use shiptrack_recon::RawImportRow;

pub const HEADER_ID: &str = "ID";
pub const HEADER_TRACKING: &str = "NÚMERO GUIA";
pub const HEADER_STATUS: &str = "ESTATUS";

pub const REQUIRED_HEADERS: [&str; 3] = [HEADER_ID, HEADER_TRACKING, HEADER_STATUS];

/// File extensions accepted as import batches.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xls", "ods", "csv", "tsv"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    Io(String),
    UnsupportedFormat(String),
    /// The file has no header row.
    Empty,
    MissingHeaders(Vec<String>),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "cannot read import file: {msg}"),
            Self::UnsupportedFormat(ext) => write!(f, "unsupported import format: '{ext}'"),
            Self::Empty => write!(f, "import file is empty"),
            Self::MissingHeaders(h) => write!(f, "missing required column(s): {}", h.join(", ")),
        }
    }
}

impl std::error::Error for ImportError {}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderMap {
    pub id: usize,
    pub tracking: usize,
    pub status: usize,
}

impl HeaderMap {
    pub fn resolve(header: &[String]) -> Result<Self, ImportError> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let find = |name: &str| normalized.iter().position(|h| h == name);

        match (find(HEADER_ID), find(HEADER_TRACKING), find(HEADER_STATUS)) {
            (Some(id), Some(tracking), Some(status)) => Ok(Self { id, tracking, status }),
            _ => Err(ImportError::MissingHeaders(
                REQUIRED_HEADERS
                    .into_iter()
                    .filter(|h| find(*h).is_none())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

pub fn normalize_header(h: &str) -> String {
    h.trim().trim_start_matches('\u{feff}').trim().to_uppercase()
}

/// Read an import file (Excel or delimited text) into raw rows.
pub fn read_rows(path: &Path) -> Result<Vec<RawImportRow>, ImportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => crate::xlsx::read_first_sheet(path),
        "csv" | "tsv" => crate::csv::read_table(path),
        _ => return Err(ImportError::UnsupportedFormat(ext)),
    }
    .map_err(ImportError::Io)?;

    rows_from_table(&table)
}

/// Build raw rows from a table whose first row is the header. Fully blank
/// rows are skipped; short rows read missing cells as empty.
pub fn rows_from_table(table: &[Vec<String>]) -> Result<Vec<RawImportRow>, ImportError> {
    let (header, body) = table.split_first().ok_or(ImportError::Empty)?;
    let cols = HeaderMap::resolve(header)?;

    let cell = |row: &[String], i: usize| row.get(i).cloned().unwrap_or_default();

    Ok(body
        .iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| RawImportRow {
            source_id: cell(row, cols.id),
            tracking_number: cell(row, cols.tracking),
            internal_status: cell(row, cols.status),
        })
        .collect())
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
