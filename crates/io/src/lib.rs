//! File I/O for shiptrack: import batches (Excel and delimited text), the
//! CSV tracking sheet and the per-run differences reports.

pub mod csv;
pub mod folder;
pub mod import;
pub mod store;
pub mod xlsx;

pub use folder::FolderImporter;
pub use import::{read_rows, ImportError};
pub use store::{CsvSheetStore, ReportFormat};
