//! Write paths: versioned update and logical delete.
//!
//! Both run entirely under the exclusive lock of the affected series, so no
//! reader observes a key with zero or two alive versions mid-operation.
//! Every precondition is checked before the first mutation; a failed update
//! or delete leaves the store untouched.

use super::DB;
use crate::compute::temporal::selector;
use crate::compute::validation;
use crate::error::{BitempError, Result};
use crate::storage::unknown_key;
use crate::types::{Measurement, MeasurementKey, SeriesKey, ValidTimeQuery, VersionHandle};
use chrono::NaiveDateTime;

impl DB {
    /// Supersede the alive version of `key` with `new_value`.
    ///
    /// The version alive at `transaction_now` (default: the system
    /// perspective) is closed at that instant and a new open version with the
    /// same valid time and unit starts there.
    ///
    /// # Errors
    ///
    /// - `UnknownKey` if nothing was ever recorded for `key`
    /// - `NoAliveVersionAtPerspective` if no version is alive at `transaction_now`
    /// - `AlreadyClosed` if the alive version was already closed later on
    /// - `DuplicateTransactionTime` if `transaction_now` does not advance past
    ///   the key's latest `system_from`
    pub fn update(
        &self,
        key: &MeasurementKey,
        new_value: f64,
        transaction_now: Option<NaiveDateTime>,
    ) -> Result<VersionHandle> {
        self.ensure_open()?;
        validation::validate_value(new_value)?;
        let now = self.resolve_perspective(transaction_now);

        let handle = self
            .store
            .with_series_mut(&key.series, |series| {
                let (ordinal, unit) = {
                    let alive = selector::exact(series, key, now)?;
                    if let Some(system_to) = alive.version.system_to {
                        return Err(BitempError::AlreadyClosed {
                            key: key.to_string(),
                            ordinal: alive.ordinal,
                            system_to,
                        });
                    }
                    let last = series
                        .versions(key.valid_time)
                        .and_then(|versions| versions.last())
                        .map(|version| version.system_from)
                        .unwrap_or(alive.version.system_from);
                    if now <= last {
                        return Err(BitempError::DuplicateTransactionTime {
                            key: key.to_string(),
                            system_from: now,
                            last,
                        });
                    }
                    (alive.ordinal, alive.version.unit.clone())
                };

                series.close(key, ordinal, now)?;
                let new_ordinal = series.insert(key, new_value, unit, now)?;
                Ok(VersionHandle {
                    key: key.clone(),
                    ordinal: new_ordinal,
                })
            })
            .unwrap_or_else(|| Err(unknown_key(key)))?;

        self.record_operation();
        log::debug!("Updated {} to {} at {}", key, new_value, now);
        Ok(handle)
    }

    /// Logically delete a measurement by closing its alive version.
    ///
    /// `ValidTimeQuery::Exact` targets one key; `ValidTimeQuery::Day` targets
    /// whichever version date-only retrieval would return at
    /// `transaction_now`. Nothing is inserted and every version stays visible
    /// to history queries. Returns the closed version.
    pub fn delete(
        &self,
        series: &SeriesKey,
        query: ValidTimeQuery,
        transaction_now: Option<NaiveDateTime>,
    ) -> Result<Measurement> {
        self.ensure_open()?;
        let now = self.resolve_perspective(transaction_now);

        let closed = self
            .store
            .with_series_mut(series, |bucket| {
                let (key, ordinal) = {
                    let alive = match query {
                        ValidTimeQuery::Exact(valid_time) => {
                            selector::exact(bucket, &series.at(valid_time), now)?
                        }
                        ValidTimeQuery::Day(date) => {
                            selector::latest_on_date(bucket, series, date, now)?
                        }
                    };
                    (series.at(alive.version.valid_time), alive.ordinal)
                };

                bucket.close(&key, ordinal, now)?;
                bucket
                    .versions(key.valid_time)
                    .and_then(|versions| versions.get(ordinal))
                    .cloned()
                    .ok_or_else(|| unknown_key(&key))
            })
            .unwrap_or_else(|| {
                Err(match query {
                    ValidTimeQuery::Exact(valid_time) => unknown_key(&series.at(valid_time)),
                    ValidTimeQuery::Day(date) => {
                        selector::no_alive_version_on_date(series, date, now)
                    }
                })
            })?;

        self.record_operation();
        log::debug!(
            "Logically deleted {} at {}",
            series.at(closed.valid_time),
            now
        );
        Ok(self.measurement(series, &closed))
    }
}
