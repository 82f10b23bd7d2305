//! Configuration for bitemp
//!
//! Every field has a default, so an empty JSON object is a valid config.
//!
//! # Example
//!
//! ```rust
//! use bitemp::{Config, LoadPolicy};
//!
//! let json = r#"{
//!     "perspective": "2018-05-24T00:00:00",
//!     "load_policy": "strict",
//!     "formats": { "date": "%Y-%m-%d" }
//! }"#;
//! let config = Config::from_json(json).unwrap();
//! assert_eq!(config.load_policy, LoadPolicy::Strict);
//! assert_eq!(config.formats.time, "%H:%M");
//! ```

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// What `load_initial` does with a record it cannot insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Abort the load at the first failing record.
    Strict,
    /// Log and report failing records, insert the rest.
    #[default]
    SkipInvalid,
}

/// strftime layouts the console uses to read and print timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    #[serde(default = "FormatConfig::default_date")]
    pub date: String,
    #[serde(default = "FormatConfig::default_time")]
    pub time: String,
    #[serde(default = "FormatConfig::default_datetime")]
    pub datetime: String,
}

impl FormatConfig {
    fn default_date() -> String {
        "%d/%m/%Y".to_string()
    }

    fn default_time() -> String {
        "%H:%M".to_string()
    }

    fn default_datetime() -> String {
        "%d/%m/%Y %H:%M".to_string()
    }

    pub fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), &self.date).ok()
    }

    pub fn parse_time(&self, raw: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(raw.trim(), &self.time).ok()
    }

    pub fn parse_datetime(&self, raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw.trim(), &self.datetime).ok()
    }

    pub fn render_datetime(&self, at: NaiveDateTime) -> String {
        let mut out = String::new();
        match write!(out, "{}", at.format(&self.datetime)) {
            Ok(()) => out,
            Err(_) => at.to_string(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        let sample_date = NaiveDate::from_ymd_opt(2018, 5, 17).ok_or("bad sample date")?;
        let sample_time = NaiveTime::from_hms_opt(21, 30, 0).ok_or("bad sample time")?;
        let sample = sample_date.and_time(sample_time);

        for (name, layout) in [
            ("date", &self.date),
            ("time", &self.time),
            ("datetime", &self.datetime),
        ] {
            if layout.trim().is_empty() {
                return Err(format!("{name} format must not be empty"));
            }
            if StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
                return Err(format!("{name} format is not a valid strftime layout: {layout}"));
            }
        }

        let mut rendered = String::new();
        write!(rendered, "{}", sample.format(&self.date)).map_err(|e| e.to_string())?;
        if self.parse_date(&rendered) != Some(sample_date) {
            return Err(format!("date format does not round-trip: {}", self.date));
        }

        rendered.clear();
        write!(rendered, "{}", sample.format(&self.time)).map_err(|e| e.to_string())?;
        if self.parse_time(&rendered) != Some(sample_time) {
            return Err(format!("time format does not round-trip: {}", self.time));
        }

        rendered.clear();
        write!(rendered, "{}", sample.format(&self.datetime)).map_err(|e| e.to_string())?;
        if self.parse_datetime(&rendered) != Some(sample) {
            return Err(format!("datetime format does not round-trip: {}", self.datetime));
        }

        Ok(())
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            date: Self::default_date(),
            time: Self::default_time(),
            datetime: Self::default_datetime(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Initial system perspective; the wall clock at open time when unset.
    #[serde(default)]
    pub perspective: Option<NaiveDateTime>,

    #[serde(default)]
    pub load_policy: LoadPolicy,

    #[serde(default)]
    pub formats: FormatConfig,
}

impl Config {
    pub fn with_perspective(mut self, perspective: NaiveDateTime) -> Self {
        self.perspective = Some(perspective);
        self
    }

    pub fn with_load_policy(mut self, policy: LoadPolicy) -> Self {
        self.load_policy = policy;
        self
    }

    pub fn with_formats(mut self, formats: FormatConfig) -> Self {
        self.formats = formats;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        self.formats.validate()
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
