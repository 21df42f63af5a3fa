//! Human-readable error descriptions and structured JSON error formatting.

use drain_core::error::{BuildError, DrainError};
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingStore => {
                "What happened: No store was provided to the monitor.\nLikely causes: The store failed to open or was not wired into the builder.\nHow to fix: Check --store or [store].path and rerun.".to_string()
            }
            BuildError::MissingRenderer => {
                "What happened: No renderer was provided to the monitor.\nLikely causes: Output could not be set up.\nHow to fix: Re-run with --log-level=debug for details.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DrainError>() {
        return match de {
            DrainError::Config(msg) => format!(
                "What happened: The configuration could not be loaded ({msg}).\nLikely causes: Wrong --config path, a TOML syntax error, or out-of-range values.\nHow to fix: Edit the config file, then rerun."
            ),
            DrainError::Transport(msg) => format!(
                "What happened: The store could not be reached ({msg}).\nLikely causes: Wrong --store path, the export has not been written yet, or the file is not valid JSON.\nHow to fix: Check the store path and its contents, then rerun."
            ),
            DrainError::ActuatorWrite { field, value, reason } => format!(
                "What happened: Writing {field} = {value} was refused ({reason}).\nLikely causes: The store is read-only or its servo_control node is malformed.\nHow to fix: Check write permissions on the store and retry the command."
            ),
            DrainError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors raised before the typed layer
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("spawning monitor thread") {
        return format!(
            "What happened: The monitor thread could not be started.\nLikely causes: The process hit its thread or memory limit.\nHow to fix: Check ulimits, then rerun. Original: {msg}"
        );
    }

    if lower.contains("log file") {
        return format!(
            "What happened: The log file could not be set up.\nLikely causes: [logging].file points into a missing or read-only directory.\nHow to fix: Fix the path or remove [logging].file. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error kind; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<DrainError>() {
        Some(DrainError::Config(_)) => 2,
        Some(DrainError::Transport(_)) => 3,
        Some(DrainError::ActuatorWrite { .. }) => 4,
        Some(DrainError::State(_)) => 5,
        None => 1,
    }
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Config";
    }
    match err.downcast_ref::<DrainError>() {
        Some(DrainError::Config(_)) => "Config",
        Some(DrainError::Transport(_)) => "Transport",
        Some(DrainError::ActuatorWrite { .. }) => "ActuatorWrite",
        Some(DrainError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let msg = humanize(err);
    let reason = reason_name(err);
    if let Some(DrainError::ActuatorWrite { field, value, .. }) = err.downcast_ref::<DrainError>() {
        return json!({
            "reason": reason,
            "details": { "field": field.key(), "value": value },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason, "message": msg }).to_string()
}
