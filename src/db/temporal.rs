//! Read paths: point-in-time retrieval and history.

use super::DB;
use crate::compute::temporal::{HistoryQuery, history, selector};
use crate::error::{BitempError, Result};
use crate::storage::unknown_key;
use crate::types::{Measurement, MeasurementKey, SeriesKey, ValidTimeQuery, Version};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

impl DB {
    /// Retrieve one measurement.
    ///
    /// With a time of day this is an exact valid-time lookup; without one it
    /// returns the latest measurement of that date alive at the perspective.
    /// `perspective` defaults to the system perspective.
    pub fn retrieve(
        &self,
        series: &SeriesKey,
        date: NaiveDate,
        time: Option<NaiveTime>,
        perspective: Option<NaiveDateTime>,
    ) -> Result<Measurement> {
        self.retrieve_query(series, ValidTimeQuery::from_parts(date, time), perspective)
    }

    /// Exact valid-time retrieval for a full key.
    pub fn retrieve_exact(
        &self,
        key: &MeasurementKey,
        perspective: Option<NaiveDateTime>,
    ) -> Result<Measurement> {
        self.retrieve_query(&key.series, ValidTimeQuery::Exact(key.valid_time), perspective)
    }

    pub fn retrieve_query(
        &self,
        series: &SeriesKey,
        query: ValidTimeQuery,
        perspective: Option<NaiveDateTime>,
    ) -> Result<Measurement> {
        self.ensure_open()?;
        let perspective = self.resolve_perspective(perspective);

        let version = match query {
            ValidTimeQuery::Exact(valid_time) => {
                let key = series.at(valid_time);
                self.store
                    .with_series(series, |bucket| {
                        selector::exact(bucket, &key, perspective).map(|s| s.version.clone())
                    })
                    .unwrap_or_else(|| Err(unknown_key(&key)))?
            }
            ValidTimeQuery::Day(date) => self
                .store
                .with_series(series, |bucket| {
                    selector::latest_on_date(bucket, series, date, perspective)
                        .map(|s| s.version.clone())
                })
                .unwrap_or_else(|| {
                    Err(selector::no_alive_version_on_date(series, date, perspective))
                })?,
        };

        Ok(self.measurement(series, &version))
    }

    /// Every version with valid time in `[start, end]`, ordered by valid time
    /// then transaction time. No perspective filter applies.
    pub fn query_history(
        &self,
        series: &SeriesKey,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Measurement>> {
        self.query_history_with(series, start, end, &HistoryQuery::default())
    }

    pub fn query_history_with(
        &self,
        series: &SeriesKey,
        start: NaiveDateTime,
        end: NaiveDateTime,
        query: &HistoryQuery,
    ) -> Result<Vec<Measurement>> {
        self.ensure_open()?;
        if start > end {
            return Err(BitempError::InvalidRange { start, end });
        }

        let versions = self
            .store
            .with_series(series, |bucket| history::collect(bucket, start, end, query))
            .unwrap_or_default();

        Ok(versions
            .iter()
            .map(|version| self.measurement(series, version))
            .collect())
    }

    /// Full history of a single key.
    pub fn versions_for(&self, key: &MeasurementKey) -> Result<Vec<Version>> {
        self.ensure_open()?;
        self.store.versions_for(key)
    }

    /// Every version of every key of `series` taken on `date`.
    pub fn versions_for_date(
        &self,
        series: &SeriesKey,
        date: NaiveDate,
    ) -> Result<Vec<(MeasurementKey, Version)>> {
        self.ensure_open()?;
        Ok(self.store.versions_for_date(series, date))
    }
}
