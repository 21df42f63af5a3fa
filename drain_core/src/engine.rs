//! The per-event reconciliation step (`Engine`).
//!
//! Glues the stateless pieces to the actuator timer: a raw sensor node goes
//! through latest-record selection, normalization and reconciliation, and the
//! resulting command is handed to the timer. The engine keeps the last good
//! view model and GPS fix so faults never blank the display.

use std::time::Instant;

use drain_traits::{ActuatorStore, ServoControl, SnapshotSource};
use serde_json::Value;

use crate::actuator::{ActuatorState, ActuatorTimer};
use crate::config::{EngineCfg, MonitorCfg, NormalizeCfg};
use crate::error::DrainError;
use crate::gps::{GeoPoint, GpsFix};
use crate::reconcile::{ActuatorCommand, Diagnosis, Reconciliation, ViewModel, reconcile};
use crate::snapshot::{NormalizedSnapshot, normalize, select_latest};
use crate::status::Transition;

/// Everything produced by one snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStep {
    pub snapshot: NormalizedSnapshot,
    pub view: ViewModel,
    pub diagnosis: Diagnosis,
    pub command: ActuatorCommand,
    pub transition: Transition,
    /// Set when the timer tried to write and the store refused.
    pub fault: Option<DrainError>,
}

#[derive(Debug, Clone)]
pub enum Ingest {
    Updated(Box<SnapshotStep>),
    /// The sensor node held no record.
    NoData,
}

pub struct Engine<S: ActuatorStore> {
    pub(crate) normalize: NormalizeCfg,
    pub(crate) engine: EngineCfg,
    pub(crate) timer: ActuatorTimer<S>,
    pub(crate) last_view: Option<ViewModel>,
    pub(crate) last_gps: Option<GpsFix>,
}

impl<S: ActuatorStore> core::fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("actuator", self.timer.state())
            .field("phase", &self.timer.phase())
            .field("has_view", &self.last_view.is_some())
            .finish()
    }
}

impl<S: ActuatorStore> Engine<S> {
    pub fn new(store: S, cfg: &MonitorCfg) -> Self {
        Self {
            normalize: cfg.normalize,
            engine: cfg.engine,
            timer: ActuatorTimer::new(store, cfg.timer),
            last_view: None,
            last_gps: None,
        }
    }

    pub fn timer(&self) -> &ActuatorTimer<S> {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut ActuatorTimer<S> {
        &mut self.timer
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.timer.store_mut()
    }

    pub fn actuator_state(&self) -> &ActuatorState {
        self.timer.state()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Last successfully reconciled view, kept across transport faults.
    pub fn last_view(&self) -> Option<&ViewModel> {
        self.last_view.as_ref()
    }

    /// Reconcile without touching the timer or the retained view.
    pub fn preview(&self, raw: &Value) -> Option<Reconciliation> {
        let latest = select_latest(raw)?;
        let snap = normalize(latest, &self.normalize);
        Some(reconcile(&snap, self.timer.state(), &self.engine))
    }

    /// Run one snapshot through the pipeline and execute its command.
    pub fn on_snapshot(&mut self, raw: &Value, now: Instant) -> Ingest {
        let Some(latest) = select_latest(raw) else {
            return Ingest::NoData;
        };
        let snapshot = normalize(latest, &self.normalize);
        let Reconciliation {
            view,
            diagnosis,
            command,
        } = reconcile(&snapshot, self.timer.state(), &self.engine);

        self.timer.observe_diagnosis(diagnosis.is_blockage);
        let (transition, fault) = match self.timer.apply(command, now) {
            Ok(t) => (t, None),
            Err(e) => (Transition::Unchanged, Some(e)),
        };

        self.last_gps = Some(snapshot.gps);
        self.last_view = Some(view.clone());
        Ingest::Updated(Box::new(SnapshotStep {
            snapshot,
            view,
            diagnosis,
            command,
            transition,
            fault,
        }))
    }

    /// Absorb an echo of the store's control record.
    pub fn on_actuator(&mut self, ctrl: ServoControl) -> Transition {
        self.timer.observe(ctrl)
    }

    /// The on-duration deadline may have passed.
    pub fn on_deadline(&mut self, now: Instant) -> Result<Transition, DrainError> {
        self.timer.tick(now)
    }

    /// Where the map should point: the last reconciled fix, else the fallback.
    pub fn map_target(&self) -> GeoPoint {
        self.last_gps
            .map_or(self.normalize.fallback, |fix| fix.point)
    }

    /// Disarm any pending deadline. Idempotent.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }
}

impl<S: ActuatorStore + SnapshotSource> Engine<S> {
    /// One-shot refresh through the store's fetch path.
    pub fn refresh(&mut self, now: Instant) -> Result<Ingest, DrainError> {
        match self.timer.store_mut().fetch_latest() {
            Ok(Some(raw)) => Ok(self.on_snapshot(&raw, now)),
            Ok(None) => Ok(Ingest::NoData),
            Err(e) => Err(crate::store_error::map_store_error(&*e)),
        }
    }
}
