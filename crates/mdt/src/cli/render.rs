//! Text rendering of records.

use std::fmt::Write as _;

use chrono::Local;

use super::commands::OutputFormat;
use crate::agency::AgencyTable;
use crate::record::{Record, RecordFields};

/// Badge code for an agency, or `??` if the table no longer knows it.
fn badge<'a>(agencies: &'a AgencyTable, agency: &str) -> &'a str {
    agencies.get(agency).map_or("??", |a| a.code.as_str())
}

/// Headline for a record: a name, a vehicle, an incident type, or note text.
#[must_use]
pub fn title(record: &Record) -> String {
    match &record.fields {
        RecordFields::Citizen(c) => format!("{} {}", c.first_name, c.last_name),
        RecordFields::Vehicle(v) => format!("{} {}", v.make, v.model),
        RecordFields::Incident(i) => i.incident_type.clone(),
        RecordFields::Note(n) => n.content.clone(),
    }
}

fn details(record: &Record) -> Vec<(&'static str, &str)> {
    match &record.fields {
        RecordFields::Citizen(c) => vec![("DOB", &c.dob), ("License", &c.license_number)],
        RecordFields::Vehicle(v) => vec![("Plate", &v.plate_number), ("Color", &v.color)],
        RecordFields::Incident(i) => {
            vec![("Location", &i.location), ("Description", &i.description)]
        }
        RecordFields::Note(_) => Vec::new(),
    }
}

/// Render one record as a card.
#[must_use]
pub fn card(record: &Record, agencies: &AgencyTable) -> String {
    let mut out = format!("[{}] {}\n", badge(agencies, &record.agency), title(record));
    for (label, value) in details(record) {
        let _ = writeln!(out, "    {label}: {value}");
    }
    let local = record.timestamp.with_timezone(&Local);
    let _ = writeln!(out, "    {}  (id {})", local.format("%Y-%m-%d %H:%M:%S"), record.id);
    out
}

/// Render one record as a single table row.
#[must_use]
pub fn row(record: &Record, agencies: &AgencyTable) -> String {
    format!(
        "{:<15} {:<4} {}",
        record.id,
        badge(agencies, &record.agency),
        title(record)
    )
}

/// Render records in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn records(
    records: &[&Record],
    agencies: &AgencyTable,
    format: OutputFormat,
) -> serde_json::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        OutputFormat::Table => records
            .iter()
            .map(|record| row(record, agencies))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Plain => records
            .iter()
            .map(|record| card(record, agencies))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}
