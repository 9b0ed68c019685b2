//! Command-line interface for mdt.
//!
//! This module provides the CLI structure and rendering for the `mdt`
//! binary. Every record command maps onto one [`crate::RecordStore`]
//! operation.

mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    field_map, parse_assignment, ConfigCommand, CreateCommand, KindArg, ListCommand,
    OutputFormat, RecordRef, SearchCommand, ShowCommand, StatusCommand, UpdateCommand,
};

use crate::logging::Verbosity;

/// mdt - Mobile data terminal records
///
/// Keep citizens, vehicles, incidents, and notes for a dispatch terminal,
/// each tagged with the issuing agency.
#[derive(Debug, Parser)]
#[command(name = "mdt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors (command output is still printed)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a record
    Create(CreateCommand),

    /// Overwrite fields of a record
    Update(UpdateCommand),

    /// Delete a record (no error if it is already gone)
    Delete(RecordRef),

    /// Show one record
    Show(ShowCommand),

    /// List all records of a kind
    List(ListCommand),

    /// Search records of a kind
    Search(SearchCommand),

    /// List agencies
    Agencies {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show store status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
