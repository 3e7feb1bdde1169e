//! CLI command implementations
//!
//! Each invocation loads the configuration, runs one database operation and
//! prints one JSON response line.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::database::{Database, DatabaseConfig};
use crate::record::{checksum_hex, Metadata, Record};

use super::args::{Cli, Command, PayloadArgs};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments, runs the command and writes the response. On failure
/// the error response has already been written when this returns `Err`.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match execute(&cli.config, cli.command) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one command against the database described by `config_path`
pub fn execute(config_path: &Path, command: Command) -> CliResult<Value> {
    let config = DatabaseConfig::load(config_path)?;
    let mut db = Database::new(config)?;
    run_command(&mut db, command)
}

/// Run one command against an already constructed database
pub fn run_command(db: &mut Database, command: Command) -> CliResult<Value> {
    match command {
        Command::Init => {
            let header = db.header()?.clone();
            Ok(json!({
                "name": header.name,
                "version": header.version,
                "created_at": header.created_at,
                "encrypted": header.encrypted,
                "path": db.path(),
            }))
        }
        Command::Insert { key, payload, meta } => {
            let payload = read_payload(&payload)?;
            db.insert(&key, &payload, parse_metadata(&meta)?)?;
            Ok(json!({"key": key, "inserted": true}))
        }
        Command::Get { key } => {
            let record = db.get(&key)?;
            Ok(record_json(&record))
        }
        Command::Update {
            key,
            payload,
            meta,
            rebuild,
        } => {
            let payload = read_payload(&payload)?;
            let metadata = if meta.is_empty() {
                None
            } else {
                Some(parse_metadata(&meta)?)
            };
            db.update(&key, &payload, metadata, rebuild)?;
            Ok(json!({"key": key, "updated": true, "rebuild": rebuild}))
        }
        Command::Delete { key } => {
            db.delete(&key)?;
            Ok(json!({"key": key, "deleted": true}))
        }
        Command::List => {
            let keys = db.list_records()?;
            Ok(json!({"keys": keys}))
        }
        Command::Search { pattern } => {
            let keys = db.search(&pattern)?;
            Ok(json!({"keys": keys}))
        }
        Command::Compact => {
            let reclaimed = db.compact()?;
            Ok(json!({"reclaimed": reclaimed}))
        }
        Command::Stats => Ok(serde_json::to_value(db.stats()?)?),
        Command::Backup { target, overwrite } => {
            let bytes = db.backup(&target, overwrite)?;
            Ok(json!({"target": target, "bytes": bytes}))
        }
    }
}

fn read_payload(args: &PayloadArgs) -> CliResult<Vec<u8>> {
    match (&args.value, &args.file) {
        (Some(value), _) => Ok(value.clone().into_bytes()),
        (None, Some(path)) => fs::read(path).map_err(|e| {
            CliError::io_error(format!("failed to read payload {}: {}", path.display(), e))
        }),
        (None, None) => Err(CliError::usage("one of --value or --file is required")),
    }
}

/// Parse repeated `name=value` arguments
fn parse_metadata(pairs: &[String]) -> CliResult<Metadata> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| CliError::usage(format!("metadata must be name=value, got '{}'", pair)))
        })
        .collect()
}

/// UTF-8 payloads print as text, anything else as base64.
fn record_json(record: &Record) -> Value {
    let (payload, encoding) = match record.text() {
        Ok(text) => (text.to_string(), "utf8"),
        Err(_) => (STANDARD.encode(&record.payload), "base64"),
    };
    json!({
        "key": record.key,
        "payload": payload,
        "encoding": encoding,
        "metadata": record.metadata,
        "checksum": checksum_hex(&record.checksum),
    })
}
