use chrono::NaiveDateTime;
use sha1::{Digest, Sha1};

use super::extractor::Row;

/// Carrier name, used as the author of every feed entry.
pub const CARRIER: &str = "EMS";

/// Date format used in the first column of the status table.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The status table opens with two header rows before the event rows.
const HEADER_ROWS: usize = 2;

/// One logged tracking milestone, built from a five-cell table row.
///
/// The carrier publishes rows as (date, location, milestone, reason,
/// remark); `remark` is frequently empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingStep {
    /// Event time as printed by the carrier, `YYYY-MM-DD HH:MM`.
    pub date: String,
    /// Processing location (city or facility).
    pub location: String,
    /// Short status label, e.g. "Dispatched".
    pub milestone: String,
    /// Reason column; usually empty for routine milestones.
    pub reason: String,
    /// Free-form remark; may be empty.
    pub remark: String,
}

impl TrackingStep {
    /// Entry title: date and milestone joined by a space.
    pub fn title(&self) -> String {
        format!("{} {}", self.date, self.milestone)
    }

    /// Stable per-entry identifier: SHA-1 hex digest of the title text.
    ///
    /// Two events sharing date and milestone collide. That matches the
    /// identity the carrier page gives us to work with; see DESIGN.md
    /// before relying on uniqueness.
    pub fn id(&self) -> String {
        let digest = Sha1::digest(self.title().as_bytes());
        format!("{:x}", digest)
    }

    /// Event timestamp parsed from the date column.
    ///
    /// The carrier prints local time with no zone. A row whose date does
    /// not match [`DATE_FORMAT`] fails here, which fails the feed request
    /// at render time.
    pub fn updated(&self) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(&self.date, DATE_FORMAT)
    }
}

/// Maps raw table rows to tracking steps.
///
/// Drops the two header rows, then keeps only rows with exactly five
/// cells; trailing summary rows and malformed markup are discarded
/// silently. Output order equals input (document) order; the carrier's
/// ordering is passed through untouched, never re-sorted.
///
/// Pure function: an empty result is valid (a fresh tracking number has
/// no events yet).
pub fn steps_from_rows(rows: &[Row]) -> Vec<TrackingStep> {
    let mut skipped = 0usize;
    let steps: Vec<TrackingStep> = rows
        .iter()
        .skip(HEADER_ROWS)
        .filter_map(|row| match row.as_slice() {
            [date, location, milestone, reason, remark] => Some(TrackingStep {
                date: date.clone(),
                location: location.clone(),
                milestone: milestone.clone(),
                reason: reason.clone(),
                remark: remark.clone(),
            }),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(
            skipped = skipped,
            kept = steps.len(),
            "Dropped rows without exactly five cells"
        );
    }

    steps
}
