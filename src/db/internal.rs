//! Internal helpers shared by the read and write paths.

use super::DB;
use crate::compute::validation;
use crate::error::{BitempError, Result};
use crate::types::{Measurement, Record, SeriesKey, Version};
use chrono::NaiveDateTime;
use std::sync::atomic::Ordering;

impl DB {
    pub(super) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BitempError::DatabaseClosed);
        }
        Ok(())
    }

    /// The caller's time, or the system perspective when none was given.
    pub(super) fn resolve_perspective(&self, explicit: Option<NaiveDateTime>) -> NaiveDateTime {
        explicit.unwrap_or_else(|| self.system_perspective())
    }

    pub(super) fn record_operation(&self) {
        self.ops_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn measurement(&self, series: &SeriesKey, version: &Version) -> Measurement {
        let name = self
            .catalog
            .read()
            .long_common_name(&series.loinc_code)
            .to_string();
        Measurement::from_version(series, version, name)
    }

    pub(super) fn load_one(&self, record: Record) -> Result<()> {
        validation::validate_record(&record)?;
        let key = record.key();
        let unit = record.unit.filter(|unit| !is_blank_unit(unit));
        self.store.insert(&key, record.value, unit, record.system_from)?;
        Ok(())
    }
}

/// Spreadsheet exports render missing units as empty text or "nan".
fn is_blank_unit(unit: &str) -> bool {
    let unit = unit.trim();
    unit.is_empty() || unit.eq_ignore_ascii_case("nan")
}
