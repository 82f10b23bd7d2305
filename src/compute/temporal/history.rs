//! Version history across a valid-time range.
//!
//! History ignores perspective entirely: closed, superseded and logically
//! deleted versions are all part of the audit trail.

use crate::storage::Series;
use crate::types::Version;
use chrono::NaiveDateTime;

/// Optional refinements of a history query.
///
/// The default query returns every version in the range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Keep only versions whose `system_from` falls in `[from, to]`.
    pub transaction_window: Option<(NaiveDateTime, NaiveDateTime)>,
    /// Keep only the most recently recorded version of each valid time.
    pub latest_per_valid_time: bool,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction_window(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.transaction_window = Some((from, to));
        self
    }

    pub fn latest_per_valid_time(mut self) -> Self {
        self.latest_per_valid_time = true;
        self
    }

    fn admits(&self, version: &Version) -> bool {
        self.transaction_window
            .is_none_or(|(from, to)| from <= version.system_from && version.system_from <= to)
    }
}

/// Versions with valid time in `[start, end]`, ordered by valid time and
/// then by `system_from`.
pub fn collect(
    series: &Series,
    start: NaiveDateTime,
    end: NaiveDateTime,
    query: &HistoryQuery,
) -> Vec<Version> {
    let mut out = Vec::new();
    for versions in series.in_range(start, end) {
        let mut admitted = versions.iter().filter(|v| query.admits(v));
        if query.latest_per_valid_time {
            out.extend(admitted.next_back().cloned());
        } else {
            out.extend(admitted.cloned());
        }
    }
    out
}
