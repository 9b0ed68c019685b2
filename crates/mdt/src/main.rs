//! `mdt` - CLI for the dispatch terminal record store
//!
//! Each invocation loads the configured store, runs one command against it,
//! and exits. Every mutation is persisted before the command returns.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::error;

use mdt::cli::{
    field_map, render, Cli, Command, ConfigCommand, CreateCommand, OutputFormat, RecordRef,
    SearchCommand, StatusCommand, UpdateCommand,
};
use mdt::record::AGENCY_FIELD;
use mdt::{init_logging, BackendKind, Config, Record, RecordKind, RecordStore};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let result = match cli.command {
        // Config commands must work even when the store cannot be opened
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
        command => run(cli.config, command),
    };

    if let Some(err) = result.as_ref().err().and_then(store_error) {
        if err.is_rejection() {
            // Bad input leaves the store untouched
            eprintln!("mdt: {err}");
            std::process::exit(2);
        }
        if err.is_persistence_failure() {
            error!("Change not saved, the store keeps its previous contents");
        }
    }
    result
}

/// The store error behind a top-level failure, looking through added context.
fn store_error(err: &anyhow::Error) -> Option<&mdt::Error> {
    err.downcast_ref::<mdt::Error>()
}

fn run(config_path: Option<PathBuf>, command: Command) -> anyhow::Result<()> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    let mut store = RecordStore::from_config(&config).with_context(|| {
        format!(
            "failed to open {} store at {}",
            config.storage.backend,
            config.storage_path().display()
        )
    })?;

    match command {
        Command::Create(cmd) => handle_create(&mut store, &config, &cmd),
        Command::Update(cmd) => handle_update(&mut store, &cmd),
        Command::Delete(target) => handle_delete(&mut store, &target),
        Command::Show(cmd) => show(&store, &cmd.record, cmd.format),
        Command::List(cmd) => {
            let records: Vec<&Record> = store.list(cmd.kind.into()).iter().collect();
            print_records(&store, &records, cmd.format)
        }
        Command::Search(cmd) => handle_search(&store, &cmd),
        Command::Agencies { json } => handle_agencies(&store, json),
        Command::Status(cmd) => handle_status(&store, &config, &cmd),
        Command::Config(_) => {
            unreachable!("config commands are dispatched before the store opens")
        }
    }
}

fn print_records(
    store: &RecordStore,
    records: &[&Record],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let text = render::records(records, store.agencies(), format)?;
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(())
}

fn handle_create(
    store: &mut RecordStore,
    config: &Config,
    cmd: &CreateCommand,
) -> anyhow::Result<()> {
    let agency = cmd.agency.as_deref().or_else(|| {
        // Fall back to the configured agency unless --set names one
        let named = cmd.fields.iter().any(|(name, _)| name == AGENCY_FIELD);
        (!named).then_some(config.records.default_agency.as_str())
    });
    let fields = field_map(&cmd.fields, agency);
    let record = store.create(cmd.kind.into(), &fields)?;
    print_records(store, &[&record], cmd.format)
}

fn handle_update(store: &mut RecordStore, cmd: &UpdateCommand) -> anyhow::Result<()> {
    let fields = field_map(&cmd.fields, cmd.agency.as_deref());
    let record = store.update(cmd.kind.into(), &cmd.id, &fields)?;
    print_records(store, &[&record], cmd.format)
}

fn handle_delete(store: &mut RecordStore, target: &RecordRef) -> anyhow::Result<()> {
    let kind = RecordKind::from(target.kind);
    if store.delete(kind, &target.id)? {
        println!("Deleted {kind} {}", target.id);
    } else {
        println!("No {kind} with id {}", target.id);
    }
    Ok(())
}

fn show(store: &RecordStore, target: &RecordRef, format: OutputFormat) -> anyhow::Result<()> {
    let kind = RecordKind::from(target.kind);
    let Some(record) = store.get(kind, &target.id) else {
        bail!(mdt::Error::not_found(kind, target.id.clone()));
    };
    print_records(store, &[record], format)
}

fn handle_search(store: &RecordStore, cmd: &SearchCommand) -> anyhow::Result<()> {
    let records = store.search(cmd.kind.into(), &cmd.query);
    if records.is_empty() && cmd.format != OutputFormat::Json {
        println!("No matches.");
        return Ok(());
    }
    print_records(store, &records, cmd.format)
}

fn handle_agencies(store: &RecordStore, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(store.agencies())?);
    } else {
        for (id, agency) in store.agencies() {
            println!("{id:<12} {:<5} {}", agency.code, agency.color);
        }
    }
    Ok(())
}

fn handle_status(
    store: &RecordStore,
    config: &Config,
    cmd: &StatusCommand,
) -> anyhow::Result<()> {
    let stats = store.stats();
    let location = match config.storage.backend {
        BackendKind::Memory => None,
        BackendKind::Sqlite | BackendKind::File => Some(config.storage_path()),
    };

    if cmd.json {
        let status = serde_json::json!({
            "backend": store.backend_name(),
            "key": store.key(),
            "path": location,
            "counts": stats,
            "total": stats.total(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("mdt status");
        println!("----------");
        println!("Backend:    {}", store.backend_name());
        println!("Key:        {}", store.key());
        if let Some(path) = location {
            println!("Location:   {}", path.display());
        }
        println!();
        for kind in RecordKind::ALL {
            println!("{:<11} {}", format!("{}:", kind.collection()), stats.count(kind));
        }
        println!("{:<11} {}", "agencies:", stats.agencies);
    }
    Ok(())
}

fn handle_config(path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path).context("failed to load configuration")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Path:               {}", config.storage_path().display());
                println!("  Key:                {}", config.storage.key);
                println!();
                println!("[Records]");
                println!("  Default agency:     {}", config.records.default_agency);
            }
        }
        ConfigCommand::Path => {
            println!("{}", path.unwrap_or_else(Config::default_config_path).display());
        }
        ConfigCommand::Validate { file } => {
            let target = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", target.display());
            match Config::load_from(Some(target)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
