//! Point-in-time version selection.
//!
//! A version is alive at perspective `P` when `system_from <= P` and its
//! interval is still open or `P < system_to`. The closing instant belongs to
//! the successor, never to both, so no perspective sees two alive versions of
//! one key.
//!
//! Everything here is pure: callers hand in version slices borrowed from the
//! store and get borrowed selections back.

use crate::error::{BitempError, Result};
use crate::storage::{Series, unknown_key};
use crate::types::{MeasurementKey, SeriesKey, Version};
use chrono::{NaiveDate, NaiveDateTime};

/// A selected version together with its insertion ordinal within its key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selected<'a> {
    pub ordinal: usize,
    pub version: &'a Version,
}

#[inline]
pub fn is_alive_at(version: &Version, perspective: NaiveDateTime) -> bool {
    version.system_from <= perspective && version.system_to.is_none_or(|to| perspective < to)
}

/// The version of one key alive at `perspective`.
///
/// `versions` must be one key's list in insertion order. Should the list
/// ever hold more than one alive version, the most recently inserted wins.
pub fn select_exact(versions: &[Version], perspective: NaiveDateTime) -> Option<Selected<'_>> {
    versions
        .iter()
        .enumerate()
        .rev()
        .find(|(_, version)| is_alive_at(version, perspective))
        .map(|(ordinal, version)| Selected { ordinal, version })
}

/// The newest alive measurement among several keys of one day.
///
/// Alive versions are ranked by valid time, then by `system_from`. Any
/// remaining tie goes to the candidate yielded last.
pub fn select_latest_on_date<'a, I>(
    groups: I,
    perspective: NaiveDateTime,
) -> Option<Selected<'a>>
where
    I: IntoIterator<Item = &'a [Version]>,
{
    groups
        .into_iter()
        .filter_map(|versions| select_exact(versions, perspective))
        .max_by_key(|selected| (selected.version.valid_time, selected.version.system_from))
}

/// Exact valid-time selection against a series bucket.
pub fn exact<'a>(
    series: &'a Series,
    key: &MeasurementKey,
    perspective: NaiveDateTime,
) -> Result<Selected<'a>> {
    let versions = series
        .versions(key.valid_time)
        .ok_or_else(|| unknown_key(key))?;
    select_exact(versions, perspective).ok_or_else(|| no_alive_version(key, perspective))
}

/// Date-only selection against a series bucket.
pub fn latest_on_date<'a>(
    series: &'a Series,
    series_key: &SeriesKey,
    date: NaiveDate,
    perspective: NaiveDateTime,
) -> Result<Selected<'a>> {
    select_latest_on_date(series.on_date(date), perspective)
        .ok_or_else(|| no_alive_version_on_date(series_key, date, perspective))
}

pub(crate) fn no_alive_version(key: &MeasurementKey, perspective: NaiveDateTime) -> BitempError {
    BitempError::NoAliveVersionAtPerspective {
        key: key.to_string(),
        perspective,
    }
}

pub(crate) fn no_alive_version_on_date(
    series: &SeriesKey,
    date: NaiveDate,
    perspective: NaiveDateTime,
) -> BitempError {
    BitempError::NoAliveVersionOnDate {
        series: series.to_string(),
        date,
        perspective,
    }
}
