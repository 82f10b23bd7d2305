//! In-memory record store.
//!
//! Holds every version of every measurement, bucketed by series
//! (patient + LOINC code). The store is append-only apart from closing a
//! version's transaction interval, which happens at most once per version.
//!
//! Series buckets live in a sharded [`DashMap`]: reads take a shared lock on
//! one bucket, writes an exclusive one. Callers that must read, close and
//! insert as one step use [`RecordStore::with_series_mut`], which holds the
//! bucket's exclusive lock for the whole closure.

mod series;

pub use series::Series;

use crate::error::{BitempError, Result};
use crate::types::{MeasurementKey, SeriesKey, Version, VersionHandle};
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub series_count: usize,
    pub key_count: usize,
    pub version_count: usize,
    pub open_versions: usize,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    series: DashMap<SeriesKey, Series, FxBuildHasher>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            series: DashMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Appends a new open version for `key`.
    ///
    /// The key's currently open version, if any, is closed at `system_from`.
    /// Fails with `DuplicateTransactionTime` unless `system_from` is strictly
    /// later than every `system_from` already recorded for the key.
    pub fn insert(
        &self,
        key: &MeasurementKey,
        value: f64,
        unit: Option<String>,
        system_from: NaiveDateTime,
    ) -> Result<VersionHandle> {
        let mut series = self.series.entry(key.series.clone()).or_default();
        let ordinal = series.insert(key, value, unit, system_from)?;
        Ok(VersionHandle {
            key: key.clone(),
            ordinal,
        })
    }

    /// Closes an open version at `system_to`.
    pub fn close(&self, handle: &VersionHandle, system_to: NaiveDateTime) -> Result<()> {
        let mut series = self
            .series
            .get_mut(&handle.key.series)
            .ok_or_else(|| unknown_key(&handle.key))?;
        series.close(&handle.key, handle.ordinal, system_to)
    }

    /// All versions of `key` in insertion order.
    pub fn versions_for(&self, key: &MeasurementKey) -> Result<Vec<Version>> {
        self.with_series(&key.series, |series| {
            series.versions(key.valid_time).map(|list| list.to_vec())
        })
        .flatten()
        .ok_or_else(|| unknown_key(key))
    }

    /// Every version of every key of `series` whose valid time falls on `date`.
    pub fn versions_for_date(
        &self,
        series: &SeriesKey,
        date: NaiveDate,
    ) -> Vec<(MeasurementKey, Version)> {
        self.with_series(series, |bucket| {
            bucket
                .on_date(date)
                .flat_map(|list| list.iter())
                .map(|version| (series.at(version.valid_time), version.clone()))
                .collect()
        })
        .unwrap_or_default()
    }

    /// Runs `f` under a shared lock on one series.
    pub(crate) fn with_series<R>(
        &self,
        series: &SeriesKey,
        f: impl FnOnce(&Series) -> R,
    ) -> Option<R> {
        self.series.get(series).map(|bucket| f(bucket.value()))
    }

    /// Runs `f` under an exclusive lock on one series. The lock is released
    /// when `f` returns, whatever the outcome.
    pub(crate) fn with_series_mut<R>(
        &self,
        series: &SeriesKey,
        f: impl FnOnce(&mut Series) -> Result<R>,
    ) -> Option<Result<R>> {
        self.series
            .get_mut(series)
            .map(|mut bucket| f(bucket.value_mut()))
    }

    pub fn stats(&self) -> StorageStats {
        self.series
            .iter()
            .fold(StorageStats::default(), |mut stats, entry| {
                let series = entry.value();
                stats.series_count += 1;
                stats.key_count += series.key_count();
                stats.version_count += series.version_count();
                stats.open_versions += series.open_count();
                stats
            })
    }
}

pub(crate) fn unknown_key(key: &MeasurementKey) -> BitempError {
    BitempError::UnknownKey {
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_insert_and_versions_for() {
        let store = RecordStore::new();
        let key = MeasurementKey::new("Eyal", "Rothman", "14743-9", at("2018-05-17 21:00"));

        let first = store
            .insert(&key, 111.0, Some("mg/dL".into()), at("2018-05-22 10:00"))
            .unwrap();
        let second = store
            .insert(&key, 100.0, Some("mg/dL".into()), at("2018-05-23 09:00"))
            .unwrap();
        assert_eq!(first.ordinal, 0);
        assert_eq!(second.ordinal, 1);

        let versions = store.versions_for(&key).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].value, 111.0);
        assert_eq!(versions[0].system_to, Some(at("2018-05-23 09:00")));
        assert!(versions[1].is_open());
    }

    #[test]
    fn test_versions_for_unknown_key() {
        let store = RecordStore::new();
        let key = MeasurementKey::new("No", "One", "1-1", at("2018-05-17 21:00"));
        assert!(matches!(store.versions_for(&key), Err(BitempError::UnknownKey { .. })));

        // Known series, unknown valid time.
        store.insert(&key, 1.0, None, at("2018-05-22 10:00")).unwrap();
        let other = key.series.at(at("2018-05-17 22:00"));
        assert!(matches!(store.versions_for(&other), Err(BitempError::UnknownKey { .. })));
    }

    #[test]
    fn test_close_through_handle() {
        let store = RecordStore::new();
        let key = MeasurementKey::new("Eyal", "Rothman", "14743-9", at("2018-05-17 21:00"));
        let handle = store.insert(&key, 111.0, None, at("2018-05-22 10:00")).unwrap();

        store.close(&handle, at("2018-05-24 00:00")).unwrap();
        assert!(matches!(
            store.close(&handle, at("2018-05-25 00:00")),
            Err(BitempError::AlreadyClosed { .. })
        ));

        let stats = store.stats();
        assert_eq!(stats.version_count, 1);
        assert_eq!(stats.open_versions, 0);
    }

    #[test]
    fn test_versions_for_date_unions_keys() {
        let store = RecordStore::new();
        let series = SeriesKey::new("Eyal", "Rothman", "14743-9");
        for (valid, value, tx) in [
            ("2018-05-17 21:00", 67.0, "2018-05-20 10:00"),
            ("2018-05-17 23:00", 78.0, "2018-05-21 10:00"),
            ("2018-05-18 01:00", 90.0, "2018-05-21 10:00"),
        ] {
            store
                .insert(&series.at(at(valid)), value, None, at(tx))
                .unwrap();
        }

        let date = NaiveDate::from_ymd_opt(2018, 5, 17).unwrap();
        let found = store.versions_for_date(&series, date);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|(key, _)| key.date() == date));

        let unknown = SeriesKey::new("No", "One", "1-1");
        assert!(store.versions_for_date(&unknown, date).is_empty());
        assert_eq!(store.stats().series_count, 1);
        assert_eq!(store.stats().key_count, 3);
    }
}
