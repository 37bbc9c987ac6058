use std::collections::HashSet;

use crate::model::{RawImportRow, TrackingRecord};

/// Collapse import rows into one record per trimmed tracking number.
///
/// Rows with a blank tracking number are dropped. The first row for a
/// number wins, so its internal status is the one that gets reconciled;
/// output keeps first-seen order.
pub fn deduplicate(rows: &[RawImportRow]) -> Vec<TrackingRecord> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();

    for row in rows {
        let tracking_number = row.tracking_number.trim();
        if tracking_number.is_empty() || !seen.insert(tracking_number) {
            continue;
        }
        out.push(TrackingRecord {
            source_id: row.source_id.trim().to_string(),
            tracking_number: tracking_number.to_string(),
            internal_status: row.internal_status.clone(),
        });
    }

    out
}

/// Records in `incoming` whose tracking number is not already in `existing`
/// (nor earlier in `incoming`).
pub fn new_records<'a>(
    existing: &[TrackingRecord],
    incoming: &'a [TrackingRecord],
) -> Vec<&'a TrackingRecord> {
    let mut known: HashSet<&str> = existing.iter().map(|r| r.tracking_number.as_str()).collect();
    incoming
        .iter()
        .filter(|r| known.insert(r.tracking_number.as_str()))
        .collect()
}
