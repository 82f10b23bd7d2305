//! Keys, versions and result types for bi-temporal measurements.
//!
//! A measurement is identified by a [`MeasurementKey`]: the patient, the LOINC
//! code and the valid time at which the measurement was taken. Every key owns
//! an insertion-ordered list of [`Version`]s, each covering a half-open
//! transaction-time interval `[system_from, system_to)`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Patient identity as recorded in the source data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Patient {
    pub first_name: String,
    pub last_name: String,
}

impl Patient {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

impl fmt::Display for Patient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// All measurements of one LOINC code for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub patient: Patient,
    pub loinc_code: String,
}

impl SeriesKey {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        loinc_code: impl Into<String>,
    ) -> Self {
        Self {
            patient: Patient::new(first_name, last_name),
            loinc_code: loinc_code.into(),
        }
    }

    /// Key of the measurement taken at `valid_time` in this series.
    pub fn at(&self, valid_time: NaiveDateTime) -> MeasurementKey {
        MeasurementKey {
            series: self.clone(),
            valid_time,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.patient, self.loinc_code)
    }
}

/// Identifies a logical medical fact: (patient, LOINC code, valid time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasurementKey {
    pub series: SeriesKey,
    pub valid_time: NaiveDateTime,
}

impl MeasurementKey {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        loinc_code: impl Into<String>,
        valid_time: NaiveDateTime,
    ) -> Self {
        SeriesKey::new(first_name, last_name, loinc_code).at(valid_time)
    }

    pub fn date(&self) -> NaiveDate {
        self.valid_time.date()
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}",
            self.series,
            self.valid_time.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Valid-time selector for reads and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidTimeQuery {
    /// The measurement taken at exactly this instant.
    Exact(NaiveDateTime),
    /// The latest alive measurement taken on this date.
    Day(NaiveDate),
}

impl ValidTimeQuery {
    /// Builds an exact query when a time of day is known, a day query otherwise.
    pub fn from_parts(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        match time {
            Some(time) => ValidTimeQuery::Exact(date.and_time(time)),
            None => ValidTimeQuery::Day(date),
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            ValidTimeQuery::Exact(at) => at.date(),
            ValidTimeQuery::Day(date) => *date,
        }
    }
}

/// One row of bi-temporal history.
///
/// `valid_time` is the valid-time component of the owning key; the patient
/// and code come from the series the version is stored in. Only `system_to`
/// ever changes after insertion, and only once, from open to closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub valid_time: NaiveDateTime,
    pub value: f64,
    pub unit: Option<String>,
    pub system_from: NaiveDateTime,
    /// `None` while the version is still current.
    pub system_to: Option<NaiveDateTime>,
}

impl Version {
    pub fn is_open(&self) -> bool {
        self.system_to.is_none()
    }
}

/// Points at one stored version: its key plus its insertion ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionHandle {
    pub key: MeasurementKey,
    pub ordinal: usize,
}

/// A clean ingestion tuple handed over by the loader.
///
/// Field names accept both snake_case and the spreadsheet column titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "First name")]
    pub first_name: String,
    #[serde(alias = "Last name")]
    pub last_name: String,
    #[serde(alias = "LOINC-NUM", alias = "loinc_num")]
    pub loinc_code: String,
    #[serde(alias = "Value")]
    pub value: f64,
    #[serde(default, alias = "Unit")]
    pub unit: Option<String>,
    #[serde(alias = "Valid start time", with = "flexible_datetime")]
    pub valid_time: NaiveDateTime,
    #[serde(alias = "Transaction time", with = "flexible_datetime")]
    pub system_from: NaiveDateTime,
}

impl Record {
    pub fn key(&self) -> MeasurementKey {
        MeasurementKey::new(
            self.first_name.clone(),
            self.last_name.clone(),
            self.loinc_code.clone(),
            self.valid_time,
        )
    }
}

/// A version resolved for presentation, with the LOINC long common name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub key: MeasurementKey,
    pub long_common_name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub system_from: NaiveDateTime,
    pub system_to: Option<NaiveDateTime>,
}

impl Measurement {
    pub fn from_version(series: &SeriesKey, version: &Version, long_common_name: String) -> Self {
        Self {
            key: series.at(version.valid_time),
            long_common_name,
            value: version.value,
            unit: version.unit.clone(),
            system_from: version.system_from,
            system_to: version.system_to,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    /// Number of (patient, code) series
    pub series_count: usize,
    /// Number of distinct measurement keys
    pub key_count: usize,
    /// Total stored versions, closed ones included
    pub version_count: usize,
    /// Versions whose transaction interval is still open
    pub open_versions: usize,
    /// Mutations performed through this handle
    pub operations_count: u64,
}

/// Timestamp (de)serialization accepting the layouts spreadsheet exports use.
pub(crate) mod flexible_datetime {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];

    /// Date-only cells, read as midnight.
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

    pub fn serialize<S: Serializer>(at: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&at.format("%Y-%m-%dT%H:%M:%S"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(raw.trim())
            .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                    .map(|date| date.and_time(NaiveTime::MIN))
            })
    }
}
