#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `drainmon`: operator CLI for the drainage monitor.

mod cli;
mod commands;
mod error_fmt;

use clap::Parser;
use drain_config::{Config, Logging};
use drain_core::error::DrainError;
use eyre::{Result, WrapErr};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    drain_config::load_file(path)
        .map_err(|e| DrainError::Config(format!("{e:#}")))
        .wrap_err_with(|| format!("loading {}", path.display()))
}

fn init_tracing(cli: &Cli, logging: &Logging) -> Result<()> {
    // --log-level, then RUST_LOG, then [logging].level.
    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::try_new(level),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(logging.level.as_deref().unwrap_or("info"))),
    }
    .unwrap_or_else(|_| EnvFilter::new("info"));

    // Console output goes to stderr; stdout carries views and reports.
    let (console_json, console_text) = if cli.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        (Some(layer), None)
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);
        (None, Some(layer))
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("log file {file:?} has no file name"))?;
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("creating log file directory {}", dir.display()))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_text)
        .with(file_layer)
        .try_init()
        .wrap_err("installing tracing subscriber")
}

fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(&cli, &cfg.logging)?;
    let store_path = cli.store.clone().unwrap_or_else(|| cfg.store.path.clone());
    tracing::debug!(store = %store_path.display(), "configuration loaded");

    match cli.cmd {
        Commands::Monitor { sim, duration_ms } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            commands::install_ctrlc(shutdown.clone())?;
            commands::monitor(
                &cfg,
                &store_path,
                sim,
                duration_ms.map(Duration::from_millis),
                cli.json,
                &shutdown,
            )?;
            Ok(())
        }
        Commands::Inspect => commands::inspect(&cfg, &store_path, cli.json),
        Commands::Map => commands::map(&cfg, &store_path),
        Commands::Set { field, value } => {
            commands::set(&cfg, &store_path, field.into(), value)
        }
        Commands::SelfCheck => commands::self_check(&cfg, &store_path, cli.json),
    }
}
