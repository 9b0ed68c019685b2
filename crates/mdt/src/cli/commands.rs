//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::{FieldMap, RecordKind, AGENCY_FIELD};

/// Create command arguments.
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Kind of record to create
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Issuing agency (defaults to `records.default_agency`)
    #[arg(short, long)]
    pub agency: Option<String>,

    /// Field value as name=value, e.g. firstName=John (repeatable)
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub fields: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Update command arguments.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Kind of record to update
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Id of the record
    pub id: String,

    /// Move the record to another agency
    #[arg(short, long)]
    pub agency: Option<String>,

    /// Field value as name=value (repeatable); unnamed fields are kept
    #[arg(short = 's', long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    pub fields: Vec<(String, String)>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments naming one record.
#[derive(Debug, Args)]
pub struct RecordRef {
    /// Kind of record
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Id of the record
    pub id: String,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Record to show
    #[command(flatten)]
    pub record: RecordRef,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Kind of record to list
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Kind of record to search
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Text to look for, ignoring case (empty matches everything)
    #[arg(default_value = "")]
    pub query: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Record kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Citizen records
    #[value(alias = "citizens")]
    Citizen,
    /// Vehicle records
    #[value(alias = "vehicles")]
    Vehicle,
    /// Incident records
    #[value(alias = "incidents")]
    Incident,
    /// Note records
    #[value(alias = "notes")]
    Note,
}

impl From<KindArg> for RecordKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Citizen => Self::Citizen,
            KindArg::Vehicle => Self::Vehicle,
            KindArg::Incident => Self::Incident,
            KindArg::Note => Self::Note,
        }
    }
}

/// Output format for record commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Cards, one per record
    #[default]
    Plain,
    /// One line per record
    Table,
    /// Records in their stored shape
    Json,
}

/// Parse a `name=value` pair. The value may itself contain `=`.
///
/// # Errors
///
/// Returns a message if there is no `=` or the name is empty.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Collect `--set` pairs and an optional agency into a field mapping.
///
/// An explicit `--agency` wins over `--set agency=...`.
#[must_use]
pub fn field_map(fields: &[(String, String)], agency: Option<&str>) -> FieldMap {
    let mut map: FieldMap = fields.iter().cloned().collect();
    if let Some(agency) = agency {
        map.insert(AGENCY_FIELD.to_string(), agency.to_string());
    }
    map
}
