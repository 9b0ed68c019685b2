//! The persisted document: four record collections plus the agency table.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agency::{default_agencies, AgencyTable};
use crate::record::{
    CitizenFields, IncidentFields, NoteFields, Record, RecordFields, RecordKind, VehicleFields,
};

/// The aggregate root, serialized whole on every mutation.
///
/// Each collection only ever holds records of its own kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DocumentWire")]
pub struct Document {
    citizens: Vec<Record>,
    vehicles: Vec<Record>,
    incidents: Vec<Record>,
    notes: Vec<Record>,
    agencies: AgencyTable,
}

impl Default for Document {
    fn default() -> Self {
        Self::with_agencies(default_agencies())
    }
}

impl Document {
    /// An empty document with the given agency table.
    #[must_use]
    pub fn with_agencies(agencies: AgencyTable) -> Self {
        Self {
            citizens: Vec::new(),
            vehicles: Vec::new(),
            incidents: Vec::new(),
            notes: Vec::new(),
            agencies,
        }
    }

    /// Records of one kind, in insertion order.
    #[must_use]
    pub fn records(&self, kind: RecordKind) -> &[Record] {
        match kind {
            RecordKind::Citizen => &self.citizens,
            RecordKind::Vehicle => &self.vehicles,
            RecordKind::Incident => &self.incidents,
            RecordKind::Note => &self.notes,
        }
    }

    pub(crate) fn records_mut(&mut self, kind: RecordKind) -> &mut Vec<Record> {
        match kind {
            RecordKind::Citizen => &mut self.citizens,
            RecordKind::Vehicle => &mut self.vehicles,
            RecordKind::Incident => &mut self.incidents,
            RecordKind::Note => &mut self.notes,
        }
    }

    /// The agency table.
    #[must_use]
    pub fn agencies(&self) -> &AgencyTable {
        &self.agencies
    }

    /// Every record across all collections.
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        RecordKind::ALL
            .into_iter()
            .flat_map(move |kind| self.records(kind).iter())
    }

    /// Serialize the whole document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse a document, rejecting duplicate ids within a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// One persisted row; the collection it sits in fixes its kind.
#[derive(Deserialize)]
struct Row<F> {
    id: String,
    #[serde(flatten)]
    fields: F,
    agency: String,
    timestamp: DateTime<Utc>,
}

impl<F> Row<F> {
    fn into_record(self, wrap: fn(F) -> RecordFields) -> Record {
        Record {
            id: self.id,
            agency: self.agency,
            timestamp: self.timestamp,
            fields: wrap(self.fields),
        }
    }
}

#[derive(Deserialize)]
struct DocumentWire {
    citizens: Vec<Row<CitizenFields>>,
    vehicles: Vec<Row<VehicleFields>>,
    incidents: Vec<Row<IncidentFields>>,
    notes: Vec<Row<NoteFields>>,
    agencies: AgencyTable,
}

fn convert<F>(rows: Vec<Row<F>>, wrap: fn(F) -> RecordFields) -> Result<Vec<Record>, String> {
    let records: Vec<Record> = rows.into_iter().map(|row| row.into_record(wrap)).collect();
    if let Some(duplicate) = first_duplicate(&records) {
        return Err(format!(
            "duplicate id '{}' in {}",
            duplicate.id,
            duplicate.kind().collection()
        ));
    }
    Ok(records)
}

fn first_duplicate(records: &[Record]) -> Option<&Record> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .find(|record| !seen.insert(record.id.as_str()))
}

impl TryFrom<DocumentWire> for Document {
    type Error = String;

    fn try_from(wire: DocumentWire) -> Result<Self, Self::Error> {
        Ok(Self {
            citizens: convert(wire.citizens, RecordFields::Citizen)?,
            vehicles: convert(wire.vehicles, RecordFields::Vehicle)?,
            incidents: convert(wire.incidents, RecordFields::Incident)?,
            notes: convert(wire.notes, RecordFields::Note)?,
            agencies: wire.agencies,
        })
    }
}
