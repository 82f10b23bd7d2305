//! LOINC code to long common name lookup.

use crate::error::Result;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::io;

/// Long common names keyed by LOINC code.
///
/// Codes without an entry resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct LoincCatalog {
    names: FxHashMap<String, String>,
}

/// One row of a LOINC table export.
#[derive(Debug, Deserialize)]
struct LoincRow {
    #[serde(rename = "LOINC_NUM", alias = "loinc_num")]
    loinc_num: String,
    #[serde(rename = "LONG_COMMON_NAME", alias = "long_common_name")]
    long_common_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Map(FxHashMap<String, String>),
    Rows(Vec<LoincRow>),
}

impl LoincCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses either a `{code: name}` object or an array of
    /// `{"LOINC_NUM": .., "LONG_COMMON_NAME": ..}` rows.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let catalog = match document {
            CatalogDocument::Map(names) => Self { names },
            CatalogDocument::Rows(rows) => rows
                .into_iter()
                .map(|row| (row.loinc_num, row.long_common_name))
                .collect(),
        };
        Ok(catalog)
    }

    /// Reads a LOINC table export such as `Loinc.csv`. Only the `LOINC_NUM`
    /// and `LONG_COMMON_NAME` columns are used.
    pub fn from_csv<R: io::Read>(reader: R) -> Result<Self> {
        let mut catalog = Self::new();
        let mut rows = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        for row in rows.deserialize() {
            let row: LoincRow = row?;
            catalog.insert(row.loinc_num, row.long_common_name);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) -> Option<String> {
        self.names.insert(code.into(), name.into())
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    /// The long common name for `code`, or the code itself when unknown.
    pub fn long_common_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).unwrap_or(code)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LoincCatalog {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            names: iter
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }
}
