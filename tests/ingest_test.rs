use bitemp::ingest::{parse_records, read_catalog, read_records};
use bitemp::{Bitemp, BitempError, SeriesKey};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use tempfile::TempDir;

const RECORDS: &str = r#"[
  {"First name": "Eyal", "Last name": "Rothman", "LOINC-NUM": "14743-9", "Value": 111,
   "Unit": "mg/dL", "Valid start time": "2018-05-17 21:00:00",
   "Transaction time": "2018-05-22 10:00:00"},
  {"First name": "Eyal", "Last name": "Rothman", "LOINC-NUM": "14743-9", "Value": 78,
   "Unit": "nan", "Valid start time": "17/05/2018 23:00", "Transaction time": "22/05/2018 11:00"},
  {"First name": "Eyal", "Last name": "Rothman", "LOINC-NUM": "bogus", "Value": 1,
   "Valid start time": "17/05/2018 23:30", "Transaction time": "22/05/2018 12:00"}
]"#;

const LOINC: &str = r#"{"14743-9": "Glucose [Mass/volume] in Capillary blood by Glucometer"}"#;

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").expect("bad test timestamp")
}

fn write_fixtures() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join("records.json"), RECORDS).expect("write records");
    fs::write(dir.path().join("loinc.json"), LOINC).expect("write loinc");
    dir
}

/// Test 1: spreadsheet column names and timestamp layouts are accepted
#[test]
fn test_parse_spreadsheet_records() {
    let records = parse_records(RECORDS).expect("parse failed");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].valid_time, at("2018-05-17 21:00"));
    assert_eq!(records[1].system_from, at("2018-05-22 11:00"));
    assert_eq!(records[2].unit, None);
}

/// Test 2: loading through the builder skips invalid rows and resolves names
#[test]
fn test_builder_loads_files() {
    let dir = write_fixtures();
    let (db, report) = Bitemp::builder()
        .perspective(at("2018-06-01 00:00"))
        .records_path(dir.path().join("records.json"))
        .catalog_path(dir.path().join("loinc.json"))
        .build_with_report()
        .expect("Failed to open database");

    assert_eq!(report.inserted, 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].index, 2);

    let series = SeriesKey::new("Eyal", "Rothman", "14743-9");
    let date = NaiveDate::from_ymd_opt(2018, 5, 17).expect("date");
    let latest = db.retrieve(&series, date, None, None).expect("retrieve failed");
    assert_eq!(latest.value, 78.0);
    assert_eq!(latest.unit, None);
    assert_eq!(
        latest.long_common_name,
        "Glucose [Mass/volume] in Capillary blood by Glucometer"
    );
}

/// Test 3: file and format failures map to distinct errors
#[test]
fn test_read_failures() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    assert!(matches!(
        read_records(dir.path().join("missing.json")),
        Err(BitempError::Io(_))
    ));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "[{\"First name\": ").expect("write");
    assert!(matches!(read_records(&broken), Err(BitempError::Json(_))));

    fs::write(&broken, "42").expect("write");
    assert!(matches!(read_catalog(&broken), Err(BitempError::Json(_))));
}

const RECORDS_CSV: &str = "\
First name,Last name,LOINC-NUM,Value,Unit,Valid start time,Transaction time
Eyal,Rothman,14743-9,111,mg/dL,17/05/2018 21:00,22/05/2018 10:00
Eyal,Rothman,14743-9,100,mg/dL,17/05/2018 21:00,23/05/2018 09:00
Eyal,Rothman,14743-9,78,nan,17/05/2018,22/05/2018 11:00
";

const LOINC_CSV: &str = "\
\"LOINC_NUM\",\"COMPONENT\",\"PROPERTY\",\"LONG_COMMON_NAME\"
\"14743-9\",\"Glucose\",\"MCnc\",\"Glucose [Mass/volume] in Capillary blood by Glucometer\"
";

/// Test 4: CSV exports of the spreadsheet and the LOINC table load by extension
#[test]
fn test_builder_loads_csv_files() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(dir.path().join("measurements.csv"), RECORDS_CSV).expect("write records");
    fs::write(dir.path().join("Loinc.csv"), LOINC_CSV).expect("write loinc");

    let (db, report) = Bitemp::builder()
        .perspective(at("2018-06-01 00:00"))
        .records_path(dir.path().join("measurements.csv"))
        .catalog_path(dir.path().join("Loinc.csv"))
        .build_with_report()
        .expect("Failed to open database");
    assert!(report.is_clean());
    assert_eq!(report.inserted, 3);

    let series = SeriesKey::new("Eyal", "Rothman", "14743-9");
    let exact = db
        .retrieve_exact(&series.at(at("2018-05-17 21:00")), Some(at("2018-05-22 15:00")))
        .expect("retrieve failed");
    assert_eq!(exact.value, 111.0);
    assert_eq!(
        exact.long_common_name,
        "Glucose [Mass/volume] in Capillary blood by Glucometer"
    );

    // A date-only cell is the first instant of that day.
    let midnight = db
        .retrieve_exact(&series.at(at("2018-05-17 00:00")), None)
        .expect("retrieve failed");
    assert_eq!(midnight.value, 78.0);
    assert_eq!(midnight.unit, None);
}

/// Test 5: malformed CSV surfaces as a CSV error
#[test]
fn test_read_csv_failures() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let records = dir.path().join("bad.csv");
    fs::write(&records, "First name,Value\nEyal,high\n").expect("write");
    assert!(matches!(read_records(&records), Err(BitempError::Csv(_))));

    let catalog = dir.path().join("Loinc.csv");
    fs::write(&catalog, "LOINC_NUM\n14743-9\n").expect("write");
    assert!(matches!(read_catalog(&catalog), Err(BitempError::Csv(_))));

    assert!(matches!(
        read_catalog(dir.path().join("missing.csv")),
        Err(BitempError::Io(_))
    ));
}
