use std::fmt;

/// Failures that abort a run.
#[derive(Debug)]
pub enum ReconError {
    /// No import batch could be obtained, or it held no usable rows.
    ImportUnavailable(String),
    /// The tracking sheet could not be read at the start of the run.
    StoreLoad(StoreError),
    /// A collaborator could not be set up (HTTP client, store directory, ...).
    CollaboratorInit(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportUnavailable(msg) => write!(f, "import unavailable: {msg}"),
            Self::StoreLoad(err) => write!(f, "cannot load tracking sheet: {err}"),
            Self::CollaboratorInit(msg) => write!(f, "initialization failed: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreLoad(err) => Some(err),
            _ => None,
        }
    }
}

/// Error reported by a [`crate::pipeline::RecordStore`].
#[derive(Debug)]
pub enum StoreError {
    /// Filesystem or backend IO.
    Io(String),
    /// Stored data doesn't have the expected shape.
    Malformed(String),
    /// Tracking number not present in the sheet.
    UnknownTrackingNumber(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed store: {msg}"),
            Self::UnknownTrackingNumber(n) => write!(f, "tracking number '{n}' not in sheet"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
