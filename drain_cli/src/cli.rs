//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use drain_traits::ActuatorField;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "drainmon", version, about = "Drainage monitor")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON export backing the store (overrides [store].path)
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Emit JSON lines instead of text (output, logs and errors)
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Operator-writable field of the servo control record.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Field {
    /// Energize or release the servo
    ServoOn,
    /// Let the monitor start runs on blockage
    AutoMode,
}

impl From<Field> for ActuatorField {
    fn from(f: Field) -> Self {
        match f {
            Field::ServoOn => ActuatorField::ServoOn,
            Field::AutoMode => ActuatorField::AutoMode,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the store, render every snapshot and drive the servo
    Monitor {
        /// Run against an in-memory store seeded with a blocked chamber
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Stop after this many milliseconds (default: until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
    },
    /// Reconcile the latest snapshot once and print the view
    Inspect,
    /// Print the map link for the latest GPS fix (fallback site without a fix)
    Map,
    /// Write one field of the servo control record
    Set {
        #[arg(value_enum)]
        field: Field,
        #[arg(action = ArgAction::Set, value_parser = clap::value_parser!(bool))]
        value: bool,
    },
    /// Validate the config and check the store is readable
    SelfCheck,
}
