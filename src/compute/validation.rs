//! Validation for ingested measurement records.

use crate::error::{BitempError, Result};
use crate::types::Record;

/// Validates a LOINC code of the form `<digits>-<check digit>`.
///
/// # Examples
///
/// ```
/// use bitemp::compute::validation::validate_loinc_code;
///
/// assert!(validate_loinc_code("14743-9").is_ok());
/// assert!(validate_loinc_code("14743").is_err());
/// assert!(validate_loinc_code("abc-1").is_err());
/// ```
pub fn validate_loinc_code(code: &str) -> Result<()> {
    let valid = code.split_once('-').is_some_and(|(body, check)| {
        !body.is_empty()
            && body.bytes().all(|b| b.is_ascii_digit())
            && check.len() == 1
            && check.bytes().all(|b| b.is_ascii_digit())
    });

    if !valid {
        return Err(BitempError::InvalidInput(format!(
            "LOINC code must look like 12345-6, got: {:?}",
            code
        )));
    }
    Ok(())
}

/// Validates a measurement value is a finite number.
pub fn validate_value(value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(BitempError::InvalidInput(format!(
            "Measurement value must be finite, got: {}",
            value
        )));
    }
    Ok(())
}

/// Validates one ingestion record.
///
/// # Examples
///
/// ```
/// use bitemp::Record;
/// use bitemp::compute::validation::validate_record;
/// use chrono::NaiveDateTime;
///
/// let at = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
/// let mut record = Record {
///     first_name: "Eyal".into(),
///     last_name: "Rothman".into(),
///     loinc_code: "14743-9".into(),
///     value: 111.0,
///     unit: Some("mg/dL".into()),
///     valid_time: at("2018-05-17 21:00"),
///     system_from: at("2018-05-22 10:00"),
/// };
/// assert!(validate_record(&record).is_ok());
///
/// record.last_name = "  ".into();
/// assert!(validate_record(&record).is_err());
/// ```
pub fn validate_record(record: &Record) -> Result<()> {
    if record.first_name.trim().is_empty() {
        return Err(BitempError::InvalidInput(
            "Patient first name must not be empty".to_string(),
        ));
    }
    if record.last_name.trim().is_empty() {
        return Err(BitempError::InvalidInput(
            "Patient last name must not be empty".to_string(),
        ));
    }
    validate_loinc_code(&record.loinc_code)?;
    validate_value(record.value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(code: &str, value: f64) -> Record {
        let at = |s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        Record {
            first_name: "Eyal".to_string(),
            last_name: "Rothman".to_string(),
            loinc_code: code.to_string(),
            value,
            unit: None,
            valid_time: at("2018-05-17 21:00"),
            system_from: at("2018-05-22 10:00"),
        }
    }

    #[test]
    fn test_loinc_code_shapes() {
        assert!(validate_loinc_code("2339-0").is_ok());
        assert!(validate_loinc_code("-0").is_err());
        assert!(validate_loinc_code("2339-").is_err());
        assert!(validate_loinc_code("2339-01").is_err());
        assert!(validate_loinc_code("").is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        assert!(validate_record(&record("2339-0", f64::NAN)).is_err());
        assert!(validate_record(&record("2339-0", f64::INFINITY)).is_err());
        assert!(validate_record(&record("2339-0", -4.5)).is_ok());
    }
}
