//! Text rendering of query results for the console.

use bitemp::{BitempError, DbStats, FormatConfig, Measurement};

pub fn measurement(formats: &FormatConfig, m: &Measurement) -> String {
    let patient = &m.key.series.patient;
    let value = match &m.unit {
        Some(unit) => format!("{} {}", m.value, unit),
        None => m.value.to_string(),
    };
    let until = match m.system_to {
        Some(to) => formats.render_datetime(to),
        None => "now".to_string(),
    };

    format!(
        "{} {} | {} {} | valid {} | {} | recorded {} until {}",
        patient.first_name,
        patient.last_name,
        m.key.series.loinc_code,
        m.long_common_name,
        formats.render_datetime(m.key.valid_time),
        value,
        formats.render_datetime(m.system_from),
        until
    )
}

pub fn history(formats: &FormatConfig, rows: &[Measurement]) -> String {
    if rows.is_empty() {
        return "no versions in range".to_string();
    }
    rows.iter()
        .map(|row| measurement(formats, row))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn stats(stats: &DbStats) -> String {
    format!(
        "series: {}\nkeys: {}\nversions: {} ({} open)\noperations: {}",
        stats.series_count,
        stats.key_count,
        stats.version_count,
        stats.open_versions,
        stats.operations_count
    )
}

/// Absent data and invariant violations read differently from input mistakes.
pub fn error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<BitempError>() {
        Some(e) if e.is_not_found() => format!("nothing found: {e}"),
        Some(e) if e.is_invariant_violation() => format!("rejected: {e}"),
        _ => format!("error: {error:#}"),
    }
}
