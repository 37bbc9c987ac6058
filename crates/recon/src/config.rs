use std::time::Duration;

/// Default pause between two carrier lookups.
pub const DEFAULT_PACE: Duration = Duration::from_secs(2);

/// Knobs for one reconciliation pass. None of them affect results, only how
/// hard the carrier site is hit and how much of the sheet is walked.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pause inserted between consecutive fetches.
    pub pace: Duration,
    /// Check at most this many stored records.
    pub limit: Option<usize>,
    /// Reconcile the stored sheet without importing a new batch first.
    pub skip_import: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pace: DEFAULT_PACE,
            limit: None,
            skip_import: false,
        }
    }
}

impl RunOptions {
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}
