//! Type-state builder for `Monitor`.
//!
//! The builder enforces at compile time that a store and a renderer are
//! provided before `build()` is available. `try_build()` is always available
//! for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use drain_traits::clock::{Clock, MonotonicClock};
use drain_traits::{ActuatorStore, SnapshotSource};

use crate::config::MonitorCfg;
use crate::error::{BuildError, Result};
use crate::monitor::Monitor;
use crate::render::Renderer;

/// Anything that can feed the monitor: snapshots in, actuator commands out.
pub trait MonitorStore: SnapshotSource + ActuatorStore {}

impl<T: SnapshotSource + ActuatorStore + ?Sized> MonitorStore for T {}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Monitor`. The configuration is validated on `build()`.
pub struct MonitorBuilder<St, R> {
    store: Option<Box<dyn MonitorStore + Send>>,
    renderer: Option<Box<dyn Renderer + Send>>,
    cfg: Option<MonitorCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _st: PhantomData<St>,
    _r: PhantomData<R>,
}

impl Default for MonitorBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            store: None,
            renderer: None,
            cfg: None,
            clock: None,
            _st: PhantomData,
            _r: PhantomData,
        }
    }
}

impl Monitor {
    /// Start building a Monitor.
    pub fn builder() -> MonitorBuilder<Missing, Missing> {
        MonitorBuilder::default()
    }
}

/// Reject configurations the runtime cannot honour.
pub fn validate_cfg(cfg: &MonitorCfg) -> std::result::Result<(), BuildError> {
    if cfg.poll.period.is_zero() {
        return Err(BuildError::InvalidConfig("poll period must be > 0"));
    }
    if cfg.timer.on_duration.is_zero() {
        return Err(BuildError::InvalidConfig("on-duration must be > 0"));
    }
    let prox = cfg.engine.proximity_cm;
    if !prox.is_finite() || prox <= 0.0 {
        return Err(BuildError::InvalidConfig(
            "proximity threshold must be finite and > 0",
        ));
    }
    if !(cfg.engine.distance_sentinel_cm > prox && cfg.normalize.distance_sentinel_cm > prox) {
        return Err(BuildError::InvalidConfig(
            "distance sentinel must exceed the proximity threshold",
        ));
    }
    if !cfg.normalize.fallback.is_valid() {
        return Err(BuildError::InvalidConfig("fallback coordinate out of range"));
    }
    Ok(())
}

impl<St, R> MonitorBuilder<St, R> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Monitor> {
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStore))?;
        let renderer = self
            .renderer
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRenderer))?;
        let cfg = self.cfg.unwrap_or_default();
        validate_cfg(&cfg).map_err(eyre::Report::new)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };
        Monitor::spawn(store, renderer, cfg, clock)
    }

    /// Chainable setters that do not affect type-state.
    pub fn with_config(mut self, cfg: MonitorCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<R> MonitorBuilder<Missing, R> {
    pub fn with_store(
        self,
        store: impl MonitorStore + Send + 'static,
    ) -> MonitorBuilder<Set, R> {
        MonitorBuilder {
            store: Some(Box::new(store)),
            renderer: self.renderer,
            cfg: self.cfg,
            clock: self.clock,
            _st: PhantomData,
            _r: PhantomData,
        }
    }
}

impl<St> MonitorBuilder<St, Missing> {
    pub fn with_renderer(
        self,
        renderer: impl Renderer + Send + 'static,
    ) -> MonitorBuilder<St, Set> {
        MonitorBuilder {
            store: self.store,
            renderer: Some(Box::new(renderer)),
            cfg: self.cfg,
            clock: self.clock,
            _st: PhantomData,
            _r: PhantomData,
        }
    }
}

impl MonitorBuilder<Set, Set> {
    /// Validate and start the Monitor. Only available when store and renderer are set.
    pub fn build(self) -> Result<Monitor> {
        self.try_build()
    }
}
