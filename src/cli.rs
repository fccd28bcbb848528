//! Command-line surface for the `trackgraph` binary.
//!
//! Every command writes JSON to the given writer so the output can be piped
//! into other tools. Exit codes:
//!
//! - `0` success
//! - `1` error (printed by the binary)
//! - `2` traversal found nothing for the track
//! - `3` validation found structural problems

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::{load_config, resolve_db_path, TrackGraphConfig};
use crate::error::Result;
use crate::types::UniversityId;

pub const EXIT_OK: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_NOT_FOUND: u8 = 2;
pub const EXIT_INVALID: u8 = 3;

/// Degree-requirement graphs: build, inspect, and traverse.
#[derive(Parser, Debug)]
#[command(name = "trackgraph")]
#[command(version)]
#[command(about = "Store and traverse degree-requirement graphs")]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file (default: <config_dir>/trackgraph/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQLite database, overriding the config and TRACKGRAPH_DB
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the database and apply the schema
    Init,
    /// Print row counts per table
    Stats,
    /// Print a track's requirement structure
    Traverse {
        #[arg(long)]
        university: UniversityId,

        #[arg(long)]
        track: String,

        /// Maximum hops from the root (default from config)
        #[arg(long, allow_negative_numbers = true)]
        max_depth: Option<i64>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Report cycles, duplicate roots, and empty OR nodes
    Validate {
        #[arg(long)]
        university: UniversityId,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Serialize)]
struct NotFound<'a> {
    error: &'static str,
    university_id: UniversityId,
    track_id: &'a str,
}

/// Load the config named by `--config` and apply `--db` on top.
pub fn effective_config(cli: &Cli) -> Result<TrackGraphConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    Ok(config)
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Execute `command` against the catalog described by `config`, returning
/// the process exit code.
pub fn run(command: &Command, config: &TrackGraphConfig, out: &mut impl Write) -> Result<u8> {
    let catalog = Catalog::open(config)?;

    match command {
        Command::Init => {
            let path = resolve_db_path(config)?;
            write_json(
                out,
                &serde_json::json!({ "database": path, "status": "initialized" }),
                false,
            )?;
            Ok(EXIT_OK)
        }
        Command::Stats => {
            let stats = catalog.store().get_stats()?;
            write_json(out, &stats, false)?;
            Ok(EXIT_OK)
        }
        Command::Traverse {
            university,
            track,
            max_depth,
            pretty,
        } => {
            let records = catalog.query(*university, track, *max_depth)?;
            if records.is_empty() {
                let not_found = NotFound {
                    error: "not found",
                    university_id: *university,
                    track_id: track,
                };
                write_json(out, &not_found, *pretty)?;
                return Ok(EXIT_NOT_FOUND);
            }
            write_json(out, &records, *pretty)?;
            Ok(EXIT_OK)
        }
        Command::Validate { university, pretty } => {
            let report = catalog.validate(*university)?;
            write_json(out, &report, *pretty)?;
            Ok(if report.is_clean() { EXIT_OK } else { EXIT_INVALID })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
