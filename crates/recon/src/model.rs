use chrono::NaiveDateTime;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single row as read from an import file. Fields are untrimmed and may be
/// empty; normalization happens in [`crate::dedup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImportRow {
    pub source_id: String,
    pub tracking_number: String,
    pub internal_status: String,
}

impl RawImportRow {
    pub fn new(
        source_id: impl Into<String>,
        tracking_number: impl Into<String>,
        internal_status: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            tracking_number: tracking_number.into(),
            internal_status: internal_status.into(),
        }
    }
}

/// The newest import batch offered by a source.
#[derive(Debug, Clone)]
pub struct ImportBatch {
    /// Human-readable origin (file name).
    pub name: String,
    pub rows: Vec<RawImportRow>,
}

/// One shipment as known to the tracking sheet. `tracking_number` is
/// trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingRecord {
    pub source_id: String,
    pub tracking_number: String,
    pub internal_status: String,
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// Canonical carrier status. `Unknown` keeps the scraped text verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Delivered,
    InTransit,
    Pending,
    Returned,
    AtAgency,
    NotFound,
    Error,
    Unknown(String),
}

impl CanonicalStatus {
    /// The string written to the tracking sheet and used for comparison
    /// against internal statuses.
    pub fn display(&self) -> &str {
        match self {
            Self::Delivered => "ENTREGADO",
            Self::InTransit => "EN TRÁNSITO",
            Self::Pending => "PENDIENTE",
            Self::Returned => "DEVUELTO",
            Self::AtAgency => "EN AGENCIA",
            Self::NotFound => "NO ENCONTRADO",
            Self::Error => "ERROR",
            Self::Unknown(raw) => raw,
        }
    }

    /// Stable snake_case key, used for summary histograms and config.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::InTransit => "in_transit",
            Self::Pending => "pending",
            Self::Returned => "returned",
            Self::AtAgency => "at_agency",
            Self::NotFound => "not_found",
            Self::Error => "error",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Parse a keyword-group key. Only classifiable statuses are accepted.
    pub fn from_group_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "delivered" => Some(Self::Delivered),
            "in_transit" => Some(Self::InTransit),
            "pending" => Some(Self::Pending),
            "returned" => Some(Self::Returned),
            "at_agency" => Some(Self::AtAgency),
            _ => None,
        }
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display())
    }
}

/// What a [`crate::pipeline::TrackingFetcher`] hands back for one number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Status text scraped from the carrier page.
    Text(String),
    /// The page loaded but carried no recognizable status.
    NotFound,
    /// The fetch itself failed. `cause` is for logging only.
    Failed { cause: String },
}

impl FetchOutcome {
    /// Interpret a raw string that may be one of the sentinel values.
    pub fn from_sentinel(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match raw.trim() {
            "ERROR" => Self::Failed { cause: "collaborator reported ERROR".into() },
            "NOT_FOUND" | "NO ENCONTRADO" => Self::NotFound,
            _ => Self::Text(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub tracking_number: String,
    pub internal_status: String,
    pub observed: CanonicalStatus,
    pub is_different: bool,
    pub alert: bool,
}

/// Run-scoped list of records whose internal and observed statuses differ.
#[derive(Debug, Clone, Serialize)]
pub struct DifferencesReport {
    pub name: String,
    #[serde(serialize_with = "serialize_run_at")]
    pub run_at: NaiveDateTime,
    pub entries: Vec<ReconciliationResult>,
}

impl DifferencesReport {
    pub const NAME_PREFIX: &'static str = "Diferencias_";

    pub fn new(run_at: NaiveDateTime, entries: Vec<ReconciliationResult>) -> Self {
        Self {
            name: Self::name_for(run_at),
            run_at,
            entries,
        }
    }

    /// `Diferencias_YYYY-MM-DD_HH-MM`
    pub fn name_for(run_at: NaiveDateTime) -> String {
        format!("{}{}", Self::NAME_PREFIX, run_at.format("%Y-%m-%d_%H-%M"))
    }

    /// Timestamp written in the verification-date column.
    pub fn checked_at(&self) -> String {
        self.run_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn serialize_run_at<S: serde::Serializer>(v: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&v.format("%Y-%m-%dT%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn report_name_uses_minute_precision() {
        let at = NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 42)
            .unwrap();
        let report = DifferencesReport::new(at, vec![]);
        assert_eq!(report.name, "Diferencias_2026-03-07_09-05");
        assert_eq!(report.checked_at(), "2026-03-07 09:05:42");
        assert!(report.is_empty());
    }

    #[test]
    fn unknown_displays_raw_text() {
        let s = CanonicalStatus::Unknown("Guía anulada".into());
        assert_eq!(s.display(), "Guía anulada");
        assert_eq!(s.key(), "unknown");
    }

    #[test]
    fn sentinels() {
        assert_eq!(FetchOutcome::from_sentinel("NOT_FOUND"), FetchOutcome::NotFound);
        assert_eq!(FetchOutcome::from_sentinel("NO ENCONTRADO"), FetchOutcome::NotFound);
        assert!(matches!(FetchOutcome::from_sentinel("ERROR"), FetchOutcome::Failed { .. }));
        assert_eq!(
            FetchOutcome::from_sentinel("En ruta"),
            FetchOutcome::Text("En ruta".into())
        );
    }

    #[test]
    fn group_keys() {
        assert_eq!(CanonicalStatus::from_group_key("Delivered"), Some(CanonicalStatus::Delivered));
        assert_eq!(CanonicalStatus::from_group_key("at_agency"), Some(CanonicalStatus::AtAgency));
        assert_eq!(CanonicalStatus::from_group_key("error"), None);
    }
}
