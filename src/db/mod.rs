//! Core database implementation for bitemp.
//!
//! This module defines the main `DB` type: the record store, the LOINC
//! catalog and the process-wide system perspective that read and write paths
//! fall back to when the caller supplies no explicit time.

use crate::catalog::LoincCatalog;
use crate::config::{Config, LoadPolicy};
use crate::error::{BitempError, Result};
use crate::storage::RecordStore;
use crate::types::{DbStats, Record};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

mod internal;
mod mutation;
mod temporal;

/// A record that `load_initial` could not insert.
#[derive(Debug)]
pub struct RejectedRecord {
    /// Position of the record in the input sequence
    pub index: usize,
    pub error: BitempError,
}

/// Outcome of a bulk load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub inserted: usize,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Embedded bi-temporal measurement store.
///
/// - **Record store**: every version of every measurement, append-only
///   except for closing transaction intervals
/// - **Catalog**: LOINC long common names for presentation
/// - **System perspective**: the default transaction time for reads and
///   writes that do not name one
///
/// Clones share all state, including the system perspective. Reads take
/// shared locks on one series; `update` and `delete` hold the series'
/// exclusive lock across their whole read-close-insert sequence.
///
/// # Examples
///
/// ```rust
/// use bitemp::{Bitemp, MeasurementKey, Record};
/// use chrono::NaiveDateTime;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let at = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M");
/// let db = Bitemp::memory()?;
///
/// db.load_initial([Record {
///     first_name: "Eyal".into(),
///     last_name: "Rothman".into(),
///     loinc_code: "14743-9".into(),
///     value: 111.0,
///     unit: Some("mg/dL".into()),
///     valid_time: at("2018-05-17 21:00")?,
///     system_from: at("2018-05-22 10:00")?,
/// }])?;
///
/// let key = MeasurementKey::new("Eyal", "Rothman", "14743-9", at("2018-05-17 21:00")?);
/// db.update(&key, 100.0, Some(at("2018-05-23 09:00")?))?;
///
/// let before = db.retrieve_exact(&key, Some(at("2018-05-22 15:00")?))?;
/// let after = db.retrieve_exact(&key, Some(at("2018-05-24 00:00")?))?;
/// assert_eq!((before.value, after.value), (111.0, 100.0));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DB {
    pub(crate) store: Arc<RecordStore>,
    pub(crate) catalog: Arc<RwLock<LoincCatalog>>,
    pub(crate) perspective: Arc<RwLock<NaiveDateTime>>,
    pub(crate) closed: Arc<AtomicBool>,
    pub(crate) ops_count: Arc<AtomicU64>,
    pub(crate) config: Config,
}

impl DB {
    /// Create an empty database with default configuration.
    pub fn memory() -> Result<Self> {
        Self::memory_with_config(Config::default())
    }

    /// Create an empty database with custom configuration.
    pub fn memory_with_config(config: Config) -> Result<Self> {
        config.validate().map_err(BitempError::Config)?;

        let perspective = config
            .perspective
            .unwrap_or_else(|| chrono::Local::now().naive_local());

        Ok(Self {
            store: Arc::new(RecordStore::new()),
            catalog: Arc::new(RwLock::new(LoincCatalog::new())),
            perspective: Arc::new(RwLock::new(perspective)),
            closed: Arc::new(AtomicBool::new(false)),
            ops_count: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    pub fn builder() -> crate::builder::DBBuilder {
        crate::builder::DBBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The process-wide default perspective.
    pub fn system_perspective(&self) -> NaiveDateTime {
        *self.perspective.read()
    }

    /// Moves the process-wide default perspective, returning the previous one.
    pub fn set_system_perspective(&self, perspective: NaiveDateTime) -> NaiveDateTime {
        let previous = std::mem::replace(&mut *self.perspective.write(), perspective);
        log::debug!("System perspective moved from {} to {}", previous, perspective);
        previous
    }

    /// Replace the LOINC catalog used to resolve long common names.
    pub fn set_catalog(&self, catalog: LoincCatalog) {
        log::debug!("Installing LOINC catalog with {} entries", catalog.len());
        *self.catalog.write() = catalog;
    }

    /// Bulk-insert records in input order, each as one open version.
    ///
    /// Under [`LoadPolicy::Strict`] the first failing record aborts the load
    /// and its error is returned; records before it stay inserted. Under
    /// [`LoadPolicy::SkipInvalid`] failures are logged and collected in the
    /// report.
    pub fn load_initial<I>(&self, records: I) -> Result<LoadReport>
    where
        I: IntoIterator<Item = Record>,
    {
        self.ensure_open()?;

        let mut report = LoadReport::default();
        for (index, record) in records.into_iter().enumerate() {
            match self.load_one(record) {
                Ok(()) => report.inserted += 1,
                Err(error) => {
                    log::warn!("Rejected record {}: {}", index, error);
                    match self.config.load_policy {
                        LoadPolicy::Strict => {
                            self.ops_count
                                .fetch_add(report.inserted as u64, Ordering::Relaxed);
                            return Err(error);
                        }
                        LoadPolicy::SkipInvalid => {
                            report.rejected.push(RejectedRecord { index, error })
                        }
                    }
                }
            }
        }

        self.ops_count
            .fetch_add(report.inserted as u64, Ordering::Relaxed);
        log::info!(
            "Loaded {} records ({} rejected)",
            report.inserted,
            report.rejected.len()
        );
        Ok(report)
    }

    /// Get database statistics
    pub fn stats(&self) -> DbStats {
        let storage = self.store.stats();
        DbStats {
            series_count: storage.series_count,
            key_count: storage.key_count,
            version_count: storage.version_count,
            open_versions: storage.open_versions,
            operations_count: self.ops_count.load(Ordering::Relaxed),
        }
    }

    /// Close the database. Later operations fail with `DatabaseClosed`.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(BitempError::DatabaseClosed);
        }
        log::debug!("Database closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub use DB as Bitemp;
