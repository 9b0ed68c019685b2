//! Record types for mdt.
//!
//! A [`Record`] is one citizen, vehicle, incident, or note. The kind is carried
//! by the [`RecordFields`] variant and never inferred from which fields happen
//! to be present.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

/// A plain mapping from wire field name to value, as a form would submit it.
pub type FieldMap = BTreeMap<String, String>;

/// Wire name of the shared agency field.
pub const AGENCY_FIELD: &str = "agency";

/// The kind of a record, selecting its collection and field schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A person on file.
    Citizen,
    /// A registered vehicle.
    Vehicle,
    /// A reported incident.
    Incident,
    /// A free-text note.
    Note,
}

impl RecordKind {
    /// Every kind, in document order.
    pub const ALL: [RecordKind; 4] = [Self::Citizen, Self::Vehicle, Self::Incident, Self::Note];

    /// Name of this kind's collection in the persisted document.
    #[must_use]
    pub fn collection(self) -> &'static str {
        match self {
            Self::Citizen => "citizens",
            Self::Vehicle => "vehicles",
            Self::Incident => "incidents",
            Self::Note => "notes",
        }
    }

    /// Wire names of the kind-specific fields, in persisted order.
    #[must_use]
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::Citizen => &["firstName", "lastName", "dob", "licenseNumber"],
            Self::Vehicle => &["plateNumber", "make", "model", "color"],
            Self::Incident => &["type", "location", "description"],
            Self::Note => &["content"],
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Citizen => write!(f, "citizen"),
            Self::Vehicle => write!(f, "vehicle"),
            Self::Incident => write!(f, "incident"),
            Self::Note => write!(f, "note"),
        }
    }
}

/// Fields of a citizen record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitizenFields {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Date of birth as entered.
    pub dob: String,
    /// Driver license number.
    pub license_number: String,
}

/// Fields of a vehicle record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFields {
    /// License plate.
    pub plate_number: String,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Paint color.
    pub color: String,
}

/// Fields of an incident record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFields {
    /// Incident type, e.g. "10-50".
    #[serde(rename = "type")]
    pub incident_type: String,
    /// Where it happened.
    pub location: String,
    /// Free-text description.
    pub description: String,
}

/// Fields of a note record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteFields {
    /// Note body.
    pub content: String,
}

/// Kind-specific fields, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFields {
    /// Citizen fields.
    Citizen(CitizenFields),
    /// Vehicle fields.
    Vehicle(VehicleFields),
    /// Incident fields.
    Incident(IncidentFields),
    /// Note fields.
    Note(NoteFields),
}

impl RecordFields {
    /// All-empty fields for the given kind.
    #[must_use]
    pub fn empty(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Citizen => Self::Citizen(CitizenFields::default()),
            RecordKind::Vehicle => Self::Vehicle(VehicleFields::default()),
            RecordKind::Incident => Self::Incident(IncidentFields::default()),
            RecordKind::Note => Self::Note(NoteFields::default()),
        }
    }

    /// The kind these fields belong to.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Citizen(_) => RecordKind::Citizen,
            Self::Vehicle(_) => RecordKind::Vehicle,
            Self::Incident(_) => RecordKind::Incident,
            Self::Note(_) => RecordKind::Note,
        }
    }

    /// Field values paired with their wire names, in persisted order.
    #[must_use]
    pub fn values(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Citizen(c) => vec![
                ("firstName", c.first_name.as_str()),
                ("lastName", c.last_name.as_str()),
                ("dob", c.dob.as_str()),
                ("licenseNumber", c.license_number.as_str()),
            ],
            Self::Vehicle(v) => vec![
                ("plateNumber", v.plate_number.as_str()),
                ("make", v.make.as_str()),
                ("model", v.model.as_str()),
                ("color", v.color.as_str()),
            ],
            Self::Incident(i) => vec![
                ("type", i.incident_type.as_str()),
                ("location", i.location.as_str()),
                ("description", i.description.as_str()),
            ],
            Self::Note(n) => vec![("content", n.content.as_str())],
        }
    }

    fn slots_mut(&mut self) -> Vec<(&'static str, &mut String)> {
        match self {
            Self::Citizen(c) => vec![
                ("firstName", &mut c.first_name),
                ("lastName", &mut c.last_name),
                ("dob", &mut c.dob),
                ("licenseNumber", &mut c.license_number),
            ],
            Self::Vehicle(v) => vec![
                ("plateNumber", &mut v.plate_number),
                ("make", &mut v.make),
                ("model", &mut v.model),
                ("color", &mut v.color),
            ],
            Self::Incident(i) => vec![
                ("type", &mut i.incident_type),
                ("location", &mut i.location),
                ("description", &mut i.description),
            ],
            Self::Note(n) => vec![("content", &mut n.content)],
        }
    }

    /// Get a field value by wire name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values()
            .into_iter()
            .find_map(|(field, value)| (field == name).then_some(value))
    }

    /// Overwrite the fields named in `fields`, ignoring the shared `agency` key.
    ///
    /// Every name is checked before anything is written, so a rejected
    /// mapping leaves the fields untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownField`] if a name is not defined for the kind.
    pub fn apply(&mut self, fields: &FieldMap) -> Result<()> {
        let kind = self.kind();
        check_field_names(kind, fields)?;

        for (name, slot) in self.slots_mut() {
            if let Some(value) = fields.get(name) {
                *slot = value.clone();
            }
        }
        Ok(())
    }
}

/// Reject any name that is neither a field of `kind` nor `agency`.
///
/// # Errors
///
/// Returns [`Error::UnknownField`] for the first unrecognized name.
pub fn check_field_names(kind: RecordKind, fields: &FieldMap) -> Result<()> {
    let known = kind.field_names();
    match fields
        .keys()
        .find(|name| name.as_str() != AGENCY_FIELD && !known.contains(&name.as_str()))
    {
        Some(unknown) => Err(Error::unknown_field(kind, unknown.as_str())),
        None => Ok(()),
    }
}

/// One stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier, unique within the kind's collection.
    pub id: String,
    /// Key into the agency table.
    pub agency: String,
    /// Creation instant.
    pub timestamp: DateTime<Utc>,
    /// Kind-specific fields.
    pub fields: RecordFields,
}

impl Record {
    /// The record's kind.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.fields.kind()
    }

    /// Get a value by wire name, covering the shared fields too.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            AGENCY_FIELD => Some(&self.agency),
            _ => self.fields.get(name),
        }
    }

    /// The timestamp as written to storage.
    #[must_use]
    pub fn timestamp_iso(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// Check whether any searchable value contains `needle`.
    ///
    /// `needle` must already be lowercase. The id and timestamp are not
    /// searched.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.agency.to_lowercase().contains(needle)
            || self
                .fields
                .values()
                .iter()
                .any(|(_, value)| value.to_lowercase().contains(needle))
    }
}

/// Format a timestamp as RFC 3339 UTC, with only as many fractional digits
/// as the value needs.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// Serializes in the persisted row shape: id, kind fields, agency, timestamp.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let values = self.fields.values();
        let mut map = serializer.serialize_map(Some(values.len() + 3))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in values {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(AGENCY_FIELD, &self.agency)?;
        map.serialize_entry("timestamp", &self.timestamp_iso())?;
        map.end()
    }
}
