//! Version lists for one (patient, code) series.

use crate::error::{BitempError, Result};
use crate::types::{MeasurementKey, Version};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Most keys carry one or two versions.
pub(crate) type VersionList = SmallVec<[Version; 2]>;

/// Every valid-time key of one series, ordered by valid time.
///
/// Each key maps to its versions in insertion order, which is also strictly
/// increasing `system_from` order.
#[derive(Debug, Clone, Default)]
pub struct Series {
    timeline: BTreeMap<NaiveDateTime, VersionList>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Versions recorded for `valid_time`, oldest first.
    pub fn versions(&self, valid_time: NaiveDateTime) -> Option<&[Version]> {
        self.timeline.get(&valid_time).map(|list| list.as_slice())
    }

    /// Per-key version lists for every valid time on `date`.
    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &[Version]> + '_ {
        let start = date.and_time(NaiveTime::MIN);
        let end = match date.succ_opt() {
            Some(next) => Bound::Excluded(next.and_time(NaiveTime::MIN)),
            None => Bound::Unbounded,
        };
        self.timeline
            .range((Bound::Included(start), end))
            .map(|(_, list)| list.as_slice())
    }

    /// Per-key version lists for valid times in `[start, end]`.
    pub fn in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> impl Iterator<Item = &[Version]> + '_ {
        // BTreeMap::range panics on inverted bounds.
        self.timeline
            .range(start..=end.max(start))
            .filter(move |(valid_time, _)| **valid_time <= end)
            .map(|(_, list)| list.as_slice())
    }

    /// Appends an open version, closing the key's current open version at
    /// `system_from` first. Returns the new version's ordinal.
    ///
    /// `system_from` must be later than the last version's start and no
    /// earlier than its close, so intervals never overlap.
    pub(crate) fn insert(
        &mut self,
        key: &MeasurementKey,
        value: f64,
        unit: Option<String>,
        system_from: NaiveDateTime,
    ) -> Result<usize> {
        let list = self.timeline.entry(key.valid_time).or_default();

        if let Some(last) = list.last() {
            // A closed predecessor stays alive until its system_to.
            let latest = last.system_to.unwrap_or(last.system_from);
            if system_from <= last.system_from || system_from < latest {
                return Err(BitempError::DuplicateTransactionTime {
                    key: key.to_string(),
                    system_from,
                    last: latest,
                });
            }
        }

        if let Some(open) = list.iter_mut().rev().find(|v| v.is_open()) {
            open.system_to = Some(system_from);
        }

        list.push(Version {
            valid_time: key.valid_time,
            value,
            unit,
            system_from,
            system_to: None,
        });
        Ok(list.len() - 1)
    }

    /// Sets `system_to` on an open version.
    pub(crate) fn close(
        &mut self,
        key: &MeasurementKey,
        ordinal: usize,
        system_to: NaiveDateTime,
    ) -> Result<()> {
        let Some(version) = self
            .timeline
            .get_mut(&key.valid_time)
            .and_then(|list| list.get_mut(ordinal))
        else {
            return Err(BitempError::UnknownKey {
                key: format!("{key} (version {ordinal})"),
            });
        };

        if let Some(closed_at) = version.system_to {
            return Err(BitempError::AlreadyClosed {
                key: key.to_string(),
                ordinal,
                system_to: closed_at,
            });
        }
        if system_to < version.system_from {
            return Err(BitempError::InvalidInterval {
                key: key.to_string(),
                system_from: version.system_from,
                system_to,
            });
        }

        version.system_to = Some(system_to);
        Ok(())
    }

    pub fn key_count(&self) -> usize {
        self.timeline.len()
    }

    pub fn version_count(&self) -> usize {
        self.timeline.values().map(|list| list.len()).sum()
    }

    pub fn open_count(&self) -> usize {
        self.timeline
            .values()
            .flat_map(|list| list.iter())
            .filter(|v| v.is_open())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::temporal::is_alive_at;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn key(valid: &str) -> MeasurementKey {
        MeasurementKey::new("Eyal", "Rothman", "14743-9", at(valid))
    }

    #[test]
    fn test_insert_closes_previous_open_version() {
        let mut series = Series::new();
        let k = key("2018-05-17 21:00");

        assert_eq!(series.insert(&k, 111.0, None, at("2018-05-22 10:00")).unwrap(), 0);
        assert_eq!(series.insert(&k, 100.0, None, at("2018-05-23 09:00")).unwrap(), 1);

        let versions = series.versions(k.valid_time).unwrap();
        assert_eq!(versions[0].system_to, Some(at("2018-05-23 09:00")));
        assert!(versions[1].is_open());
        assert_eq!(series.open_count(), 1);
    }

    #[test]
    fn test_insert_requires_advancing_clock() {
        let mut series = Series::new();
        let k = key("2018-05-17 21:00");
        series.insert(&k, 1.0, None, at("2018-05-22 10:00")).unwrap();

        let same = series.insert(&k, 2.0, None, at("2018-05-22 10:00"));
        assert!(matches!(same, Err(BitempError::DuplicateTransactionTime { .. })));

        let earlier = series.insert(&k, 2.0, None, at("2018-05-21 10:00"));
        assert!(matches!(earlier, Err(BitempError::DuplicateTransactionTime { .. })));

        // Failed inserts leave the open version untouched.
        assert!(series.versions(k.valid_time).unwrap()[0].is_open());
        assert_eq!(series.version_count(), 1);
    }

    #[test]
    fn test_insert_after_close_cannot_overlap() {
        let mut series = Series::new();
        let k = key("2018-05-17 21:00");
        series.insert(&k, 111.0, None, at("2018-05-10 00:00")).unwrap();
        series.close(&k, 0, at("2018-05-20 00:00")).unwrap();

        let inside = series.insert(&k, 222.0, None, at("2018-05-15 00:00"));
        match inside {
            Err(BitempError::DuplicateTransactionTime { last, .. }) => {
                assert_eq!(last, at("2018-05-20 00:00"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(series.version_count(), 1);

        // Starting exactly at the close is a gapless successor.
        series.insert(&k, 222.0, None, at("2018-05-20 00:00")).unwrap();
        let versions = series.versions(k.valid_time).unwrap();
        let mid = at("2018-05-17 00:00");
        let alive = versions.iter().filter(|v| is_alive_at(v, mid)).count();
        assert_eq!(alive, 1);
        assert_eq!(versions[0].system_to, Some(at("2018-05-20 00:00")));
    }

    #[test]
    fn test_close_once() {
        let mut series = Series::new();
        let k = key("2018-05-17 21:00");
        series.insert(&k, 1.0, None, at("2018-05-22 10:00")).unwrap();

        let inverted = series.close(&k, 0, at("2018-05-21 10:00"));
        assert!(matches!(inverted, Err(BitempError::InvalidInterval { .. })));

        // Same-instant close is legal.
        series.close(&k, 0, at("2018-05-22 10:00")).unwrap();

        let again = series.close(&k, 0, at("2018-05-25 10:00"));
        assert!(matches!(again, Err(BitempError::AlreadyClosed { .. })));

        let missing = series.close(&k, 7, at("2018-05-25 10:00"));
        assert!(matches!(missing, Err(BitempError::UnknownKey { .. })));
    }

    #[test]
    fn test_on_date_spans_whole_day_only() {
        let mut series = Series::new();
        let tx = at("2018-06-01 00:00");
        for valid in [
            "2018-05-16 23:59",
            "2018-05-17 00:00",
            "2018-05-17 23:00",
            "2018-05-18 00:00",
        ] {
            series.insert(&key(valid), 1.0, None, tx).unwrap();
        }

        let date = NaiveDate::from_ymd_opt(2018, 5, 17).unwrap();
        let valid_times: Vec<_> = series.on_date(date).map(|list| list[0].valid_time).collect();
        assert_eq!(valid_times, vec![at("2018-05-17 00:00"), at("2018-05-17 23:00")]);
    }

    #[test]
    fn test_in_range_inverted_is_empty() {
        let mut series = Series::new();
        series
            .insert(&key("2018-05-17 21:00"), 1.0, None, at("2018-06-01 00:00"))
            .unwrap();

        assert_eq!(series.in_range(at("2018-05-18 00:00"), at("2018-05-17 00:00")).count(), 0);
        assert_eq!(series.in_range(at("2018-05-17 00:00"), at("2018-05-18 00:00")).count(), 1);
        assert_eq!(series.key_count(), 1);
    }
}
