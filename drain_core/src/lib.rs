#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Drainage monitor core (store-agnostic).
//!
//! This crate turns raw sensor snapshots from the rig into a render-ready
//! view and decides when to energize the clearing servo. All store
//! interactions go through `drain_traits::SnapshotSource` and
//! `drain_traits::ActuatorStore`.
//!
//! ## Architecture
//!
//! - **Snapshot normalizer**: defaults for absent or malformed fields (`snapshot`)
//! - **GPS**: `"lat,lon"` parsing with a fixed fallback (`gps`)
//! - **Reconciliation**: blockage heuristic, alert priority, proximity (`reconcile`)
//! - **Actuator timer**: on-duration, cooldown and retrigger policy (`actuator`)
//! - **Engine**: one snapshot through the whole pipeline (`engine`)
//! - **Monitor**: the single owning thread and its event loop (`monitor`)
//!
//! Data flows one way: raw snapshot -> normalizer -> reconciliation ->
//! {renderer, actuator timer}.

pub mod actuator;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod gps;
pub mod mocks;
pub mod monitor;
pub mod reconcile;
pub mod render;
pub mod snapshot;
pub mod status;
pub mod store_error;
pub mod util;

pub use actuator::{ActuatorState, ActuatorTimer, TimerPhase};
pub use builder::{MonitorBuilder, MonitorStore};
pub use config::{EngineCfg, MonitorCfg, NormalizeCfg, PollCfg, RetriggerPolicy, TimerCfg};
pub use engine::{Engine, Ingest, SnapshotStep};
pub use error::{BuildError, DrainError, Result};
pub use gps::{GeoPoint, GpsFix};
pub use monitor::{Monitor, MonitorReport};
pub use reconcile::{
    ActuatorCommand, AlertMessage, ChamberStatus, Diagnosis, Reconciliation, Severity, ViewModel,
    reconcile,
};
pub use render::{MapLauncher, Renderer};
pub use snapshot::{NormalizedSnapshot, WaterLevel, normalize, normalize_str, select_latest};
pub use status::{IgnoreReason, Transition};

/// Point `launcher` at the last reconciled GPS fix, or the fallback site.
pub fn open_map<S, M>(engine: &Engine<S>, launcher: &mut M) -> Result<GeoPoint>
where
    S: drain_traits::ActuatorStore,
    M: MapLauncher + ?Sized,
{
    let p = engine.map_target();
    launcher
        .open_external_map(p.lat, p.lon)
        .map_err(|e| eyre::eyre!("opening map at {p}: {e}"))?;
    Ok(p)
}
