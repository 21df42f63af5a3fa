//! Subcommand bodies: store assembly, one-shot reconcile and the monitor run.

use drain_config::Config;
use drain_core::error::DrainError;
use drain_core::monitor::NO_DATA_STATUS;
use drain_core::store_error::{map_store_error, write_failure};
use drain_core::{Engine, Monitor, MonitorCfg, MonitorReport, MonitorStore, Renderer};
use drain_store::{FileStore, MemoryStore};
use drain_traits::{ActuatorField, ActuatorStore, ServoControl, SnapshotSource};
use drain_ui::{JsonlRenderer, PrintMapLauncher, TextRenderer, format_view};
use eyre::{Result, WrapErr};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// How often the main thread checks for Ctrl-C and the run deadline.
const WAIT_SLICE: Duration = Duration::from_millis(25);

pub fn open_store(cfg: &Config, path: &Path) -> FileStore {
    FileStore::open(path, Duration::from_millis(cfg.store.watch_ms))
}

/// In-memory rig with chamber 3 empty and automatic mode on.
pub fn sim_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set_servo_control(ServoControl {
        servo_on: false,
        auto_mode: true,
    });
    store.push_record(
        "-sim-0001",
        json!({
            "data": {
                "water_levels": [1, 1, 0],
                "distance1": 42.0,
                "distance2": 3.5,
                "mq8": 0.42,
                "temp": 27.3,
                "ir": 0,
                "flame": 0,
            },
            "gps": "23.811855,90.357140",
            "alert": "None",
            "timestamp": 1_718_000_000,
        }),
    );
    store
}

fn renderer(json: bool) -> Box<dyn Renderer + Send> {
    if json {
        Box::new(JsonlRenderer::new(std::io::stdout()))
    } else {
        Box::new(TextRenderer::new(std::io::stdout()))
    }
}

/// Run the monitor until `shutdown` is raised or `duration` elapses.
pub fn monitor(
    cfg: &Config,
    store_path: &Path,
    sim: bool,
    duration: Option<Duration>,
    json: bool,
    shutdown: &AtomicBool,
) -> Result<MonitorReport> {
    let store: Box<dyn MonitorStore + Send> = if sim {
        tracing::info!("running against the simulated store");
        Box::new(sim_store())
    } else {
        tracing::info!(path = %store_path.display(), "watching store");
        Box::new(open_store(cfg, store_path))
    };

    let mut mon = Monitor::builder()
        .with_store(store)
        .with_renderer(renderer(json))
        .with_config(MonitorCfg::from(cfg))
        .build()?;

    let started = Instant::now();
    while !shutdown.load(Ordering::Relaxed) && mon.is_running() {
        if duration.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        std::thread::sleep(WAIT_SLICE);
    }
    let report = mon.stop();
    tracing::info!(
        snapshots = report.snapshots,
        echoes = report.echoes,
        faults = report.faults,
        runs = report.runs_started,
        "monitor stopped"
    );
    print_report(&report, json);
    Ok(report)
}

fn print_report(r: &MonitorReport, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "type": "report",
                "snapshots": r.snapshots,
                "echoes": r.echoes,
                "polls": r.polls,
                "faults": r.faults,
                "runs_started": r.runs_started,
                "runs_stopped": r.runs_stopped,
                "runs_cancelled": r.runs_cancelled,
            })
        );
    } else {
        println!(
            "stopped: {} snapshots, {} runs started, {} completed, {} cancelled, {} faults",
            r.snapshots, r.runs_started, r.runs_stopped, r.runs_cancelled, r.faults
        );
    }
}

fn fetch(store: &mut FileStore) -> Result<Option<Value>> {
    let raw = store
        .fetch_latest()
        .map_err(|e| map_store_error(&*e))
        .wrap_err("fetching latest snapshot")?;
    Ok(raw)
}

/// Reconcile the latest record once. Never writes to the store.
pub fn inspect(cfg: &Config, store_path: &Path, json: bool) -> Result<()> {
    let mut store = open_store(cfg, store_path);
    let ctrl = store.servo_control().map_err(|e| map_store_error(&e))?;
    let raw = fetch(&mut store)?;

    let mut engine = Engine::new(store, &MonitorCfg::from(cfg));
    engine.on_actuator(ctrl);
    let Some(rec) = raw.as_ref().and_then(|r| engine.preview(r)) else {
        if json {
            println!("{}", json!({"type": "status", "message": NO_DATA_STATUS}));
        } else {
            println!("status: {NO_DATA_STATUS}");
        }
        return Ok(());
    };

    if json {
        println!(
            "{}",
            json!({
                "type": "inspect",
                "view": rec.view,
                "diagnosis": rec.diagnosis,
                "command": rec.command,
                "servo_control": { "servo_on": ctrl.servo_on, "auto_mode": ctrl.auto_mode },
            })
        );
    } else {
        print!("{}", format_view(&rec.view));
        println!("  command: {:?}", rec.command);
    }
    Ok(())
}

/// Print the `geo:` link for the newest fix.
pub fn map(cfg: &Config, store_path: &Path) -> Result<()> {
    let mut store = open_store(cfg, store_path);
    let raw = match fetch(&mut store) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "no snapshot available; using the fallback site");
            None
        }
    };
    // Automatic mode is never absorbed here, so ingesting cannot command the servo.
    let mut engine = Engine::new(store, &MonitorCfg::from(cfg));
    if let Some(raw) = raw {
        engine.on_snapshot(&raw, Instant::now());
    }
    let mut launcher = PrintMapLauncher::new(std::io::stdout());
    let p = drain_core::open_map(&engine, &mut launcher)?;
    tracing::debug!(lat = p.lat, lon = p.lon, "map opened");
    Ok(())
}

/// Operator toggle: one fire-and-forget write.
pub fn set(cfg: &Config, store_path: &Path, field: ActuatorField, value: bool) -> Result<()> {
    let mut store = open_store(cfg, store_path);
    store
        .write_actuator_command(field, value)
        .map_err(|e| write_failure(field, value, &*e))?;
    tracing::info!(%field, value, "actuator field written");
    println!("{field} = {value}");
    Ok(())
}

/// Read the store and run one reconcile pass over its newest record.
/// The config was validated on load.
pub fn self_check(cfg: &Config, store_path: &Path, json: bool) -> Result<()> {
    let mut store = open_store(cfg, store_path);
    let doc = store.read_document().map_err(|e| map_store_error(&e))?;
    let ctrl = store.servo_control().map_err(|e| map_store_error(&e))?;
    let records = doc
        .get("sensor_data")
        .and_then(Value::as_object)
        .map_or(0, serde_json::Map::len);
    let latest = fetch(&mut store)?;

    let engine = Engine::new(store, &MonitorCfg::from(cfg));
    let timestamp = match latest.as_ref() {
        None => None,
        Some(raw) => match engine.preview(raw) {
            Some(rec) => Some(rec.view.timestamp_s),
            None => {
                return Err(DrainError::State("sensor_data holds no usable record".into()).into());
            }
        },
    };

    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "store": store_path.display().to_string(),
                "records": records,
                "latest_timestamp": timestamp,
                "servo_on": ctrl.servo_on,
                "auto_mode": ctrl.auto_mode,
            })
        );
    } else {
        println!(
            "OK: {} ({records} records, servo_on={}, auto_mode={})",
            store_path.display(),
            ctrl.servo_on,
            ctrl.auto_mode
        );
    }
    Ok(())
}

/// Install the Ctrl-C handler that raises `flag`.
pub fn install_ctrlc(flag: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .wrap_err("installing Ctrl-C handler")
}
