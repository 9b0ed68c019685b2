//! Agency reference table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Display metadata for an issuing agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    /// Badge color as `#RRGGBB`.
    pub color: String,
    /// Short badge code, e.g. "PD".
    pub code: String,
}

impl Agency {
    /// Create an agency entry.
    #[must_use]
    pub fn new(color: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            code: code.into(),
        }
    }
}

/// Agencies keyed by identifier.
pub type AgencyTable = BTreeMap<String, Agency>;

/// The table a fresh store starts with.
#[must_use]
pub fn default_agencies() -> AgencyTable {
    [
        ("police", Agency::new("#0000FF", "PD")),
        ("fire", Agency::new("#FF0000", "FD")),
        ("ems", Agency::new("#00FF00", "EMS")),
    ]
    .into_iter()
    .map(|(id, agency)| (id.to_string(), agency))
    .collect()
}
