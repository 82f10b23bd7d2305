//! Embedded bi-temporal store for clinical laboratory measurements.
//!
//! Every measurement carries a valid time (when it was taken) and a
//! transaction interval (when the database believed it). Updates close the
//! current version and open a new one; deletes only close. Nothing is ever
//! physically removed, so any past state can be reproduced by querying at an
//! earlier perspective.
//!
//! ```rust
//! use bitemp::{Bitemp, SeriesKey};
//! use chrono::{NaiveDate, NaiveDateTime};
//!
//! let at = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M");
//! let db = Bitemp::builder().perspective(at("2018-05-24 00:00")?).build()?;
//!
//! let series = SeriesKey::new("Eyal", "Rothman", "14743-9");
//! db.load_initial([bitemp::Record {
//!     first_name: "Eyal".into(),
//!     last_name: "Rothman".into(),
//!     loinc_code: "14743-9".into(),
//!     value: 78.0,
//!     unit: None,
//!     valid_time: at("2018-05-17 23:00")?,
//!     system_from: at("2018-05-21 10:00")?,
//! }])?;
//!
//! let day = NaiveDate::from_ymd_opt(2018, 5, 17).unwrap();
//! assert_eq!(db.retrieve(&series, day, None, None)?.value, 78.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod catalog;
pub mod compute;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod storage;
pub mod types;

pub use builder::DBBuilder;
pub use db::{Bitemp, DB, LoadReport, RejectedRecord};
pub use error::{BitempError, Result};

pub use catalog::LoincCatalog;
pub use compute::temporal::HistoryQuery;
pub use config::{Config, FormatConfig, LoadPolicy};
pub use storage::{RecordStore, Series, StorageStats};

pub use types::{
    DbStats, Measurement, MeasurementKey, Patient, Record, SeriesKey, ValidTimeQuery, Version,
    VersionHandle,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Bitemp, BitempError, DBBuilder, Result};

    pub use crate::{Config, LoadPolicy};

    pub use crate::{HistoryQuery, LoincCatalog};

    pub use crate::{Measurement, MeasurementKey, Record, SeriesKey, ValidTimeQuery};

    pub use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
}
