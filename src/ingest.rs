//! Reading measurement records and LOINC tables from disk.
//!
//! Files ending in `.csv` are read as CSV with a header row; anything else
//! is JSON. JSON records are either one array of objects or one object per
//! line. Column names follow [`Record`]'s aliases, so a spreadsheet saved
//! as CSV with its original headers loads as-is.

use crate::catalog::LoincCatalog;
use crate::error::{BitempError, Result};
use crate::types::Record;
use std::fs::{self, File};
use std::io;
use std::path::Path;

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Parse records from a JSON array or a JSON Lines document.
pub fn parse_records(input: &str) -> Result<Vec<Record>> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut records = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| {
            BitempError::InvalidInput(format!("line {}: {}", line_no + 1, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Parse records from CSV with a header row.
pub fn parse_records_csv<R: io::Read>(reader: R) -> Result<Vec<Record>> {
    let mut rows = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for row in rows.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let records = if is_csv(path) {
        parse_records_csv(File::open(path)?)?
    } else {
        parse_records(&fs::read_to_string(path)?)?
    };
    log::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

pub fn read_catalog(path: impl AsRef<Path>) -> Result<LoincCatalog> {
    let path = path.as_ref();
    let catalog = if is_csv(path) {
        LoincCatalog::from_csv(File::open(path)?)?
    } else {
        LoincCatalog::from_json(&fs::read_to_string(path)?)?
    };
    log::debug!("Read {} LOINC entries from {}", catalog.len(), path.display());
    Ok(catalog)
}
