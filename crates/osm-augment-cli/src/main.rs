//! # osm-augment CLI
//!
//! Resolves the member versions of every way and relation version in a
//! history file and prints the augmented history as JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::env;
use std::io::Write;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod config;
mod input;

use config::AugmentConfig;
use input::HistoryFile;

fn main() -> Result<()> {
    // Logs go to stderr, JSON to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "augment" => {
            if args.len() < 3 {
                eprintln!("Usage: osm-augment augment <history.json>");
                std::process::exit(1);
            }
            let config = AugmentConfig::from_env()?;
            let history = HistoryFile::load(Path::new(&args[2]))?;
            let augmented = history.augment(&config.augmenter())?;
            print_json(&augmented, config.pretty)?;
        }
        "state" => {
            if args.len() < 4 {
                eprintln!("Usage: osm-augment state <history.json> <rfc3339-time>");
                std::process::exit(1);
            }
            let at: DateTime<Utc> = DateTime::parse_from_rfc3339(&args[3])
                .with_context(|| format!("Invalid time: {}", args[3]))?
                .with_timezone(&Utc);
            let config = AugmentConfig::from_env()?;
            let history = HistoryFile::load(Path::new(&args[2]))?;
            let state = history.augment(&config.augmenter())?.state_before(at)?;
            print_json(&state, config.pretty)?;
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)
    } else {
        serde_json::to_writer(&mut out, value)
    }
    .context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

fn print_help() {
    println!(
        r#"osm-augment

USAGE:
    osm-augment <COMMAND> [ARGS]

COMMANDS:
    augment <history.json>          Resolve member versions for every way and relation version
    state <history.json> <time>     Ways and relations as they were just before <time> (RFC 3339)
    help                            Show this help message

ENVIRONMENT:
    OSM_AUGMENT_THRESHOLD_SECS      Clock skew tolerance in seconds (default 1800)
    OSM_AUGMENT_PARALLEL            Resolve parent versions in parallel (default true)
    OSM_AUGMENT_PRETTY              Pretty-print JSON output (default false)
    RUST_LOG                        Log filter (default info)

EXAMPLES:
    osm-augment augment history.json
    osm-augment state history.json 2016-01-01T12:00:00Z
"#
    );
}
