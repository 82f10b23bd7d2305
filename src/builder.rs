//! Database builder for flexible configuration
//!
//! Collects configuration, an initial record set and a LOINC catalog, then
//! opens a [`DB`] with everything loaded.

use crate::catalog::LoincCatalog;
use crate::config::Config;
use crate::db::{DB, LoadReport};
use crate::error::Result;
use crate::ingest;
use crate::types::Record;
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Builder for a database preloaded with records and a LOINC catalog.
#[derive(Debug, Default)]
pub struct DBBuilder {
    config: Config,
    records_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    records: Vec<Record>,
    catalog: Option<LoincCatalog>,
}

impl DBBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database configuration (perspective, load policy, formats).
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Initial system perspective. Overrides the one in the config.
    pub fn perspective(mut self, perspective: NaiveDateTime) -> Self {
        self.config.perspective = Some(perspective);
        self
    }

    /// JSON records file loaded on build, before any in-memory records.
    pub fn records_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// JSON LOINC table loaded on build.
    pub fn catalog_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn records<I: IntoIterator<Item = Record>>(mut self, records: I) -> Self {
        self.records.extend(records);
        self
    }

    /// In-memory catalog. A `catalog_path` takes precedence.
    pub fn catalog(mut self, catalog: LoincCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> Result<DB> {
        self.build_with_report().map(|(db, _)| db)
    }

    /// Build and return the outcome of the initial load.
    pub fn build_with_report(self) -> Result<(DB, LoadReport)> {
        let db = DB::memory_with_config(self.config)?;

        let catalog = match self.catalog_path {
            Some(path) => Some(ingest::read_catalog(path)?),
            None => self.catalog,
        };
        if let Some(catalog) = catalog {
            db.set_catalog(catalog);
        }

        let mut records = match self.records_path {
            Some(path) => ingest::read_records(path)?,
            None => Vec::new(),
        };
        records.extend(self.records);

        let report = db.load_initial(records)?;
        Ok((db, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadPolicy;
    use crate::error::BitempError;
    use crate::types::MeasurementKey;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn record(value: f64, tx: &str) -> Record {
        Record {
            first_name: "Eyal".to_string(),
            last_name: "Rothman".to_string(),
            loinc_code: "14743-9".to_string(),
            value,
            unit: None,
            valid_time: at("2018-05-17 21:00"),
            system_from: at(tx),
        }
    }

    #[test]
    fn test_builder_default() {
        let db = DBBuilder::new().build().unwrap();
        assert_eq!(db.stats().version_count, 0);
    }

    #[test]
    fn test_builder_perspective_and_records() {
        let (db, report) = DBBuilder::new()
            .perspective(at("2018-05-24 00:00"))
            .records(vec![record(111.0, "2018-05-22 10:00")])
            .catalog([("14743-9", "Glucose")].into_iter().collect())
            .build_with_report()
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(db.system_perspective(), at("2018-05-24 00:00"));

        let key = MeasurementKey::new("Eyal", "Rothman", "14743-9", at("2018-05-17 21:00"));
        let measurement = db.retrieve_exact(&key, None).unwrap();
        assert_eq!(measurement.long_common_name, "Glucose");
    }

    #[test]
    fn test_builder_reads_files_first() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            concat!(
                r#"[{{"first_name":"Eyal","last_name":"Rothman","loinc_code":"14743-9","#,
                r#""value":111,"valid_time":"2018-05-17T21:00:00","#,
                r#""system_from":"2018-05-22T10:00:00"}}]"#
            )
        )
        .unwrap();

        let db = DBBuilder::new()
            .perspective(at("2018-05-24 00:00"))
            .records_path(file.path())
            .records(vec![record(100.0, "2018-05-23 09:00")])
            .build()
            .unwrap();

        let key = MeasurementKey::new("Eyal", "Rothman", "14743-9", at("2018-05-17 21:00"));
        assert_eq!(db.versions_for(&key).unwrap().len(), 2);
        assert_eq!(db.retrieve_exact(&key, None).unwrap().value, 100.0);
    }

    #[test]
    fn test_builder_strict_load_fails() {
        let result = DBBuilder::new()
            .config(Config::default().with_load_policy(LoadPolicy::Strict))
            .records(vec![
                record(111.0, "2018-05-22 10:00"),
                record(112.0, "2018-05-22 10:00"),
            ])
            .build();
        assert!(matches!(result, Err(BitempError::DuplicateTransactionTime { .. })));
    }

    #[test]
    fn test_builder_missing_catalog_file() {
        let result = DBBuilder::new().catalog_path("/nonexistent/loinc.json").build();
        assert!(matches!(result, Err(BitempError::Io(_))));
    }
}
