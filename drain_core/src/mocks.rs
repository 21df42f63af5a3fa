//! Test and helper mocks for drain_core

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drain_traits::BoxError;

use crate::actuator::ActuatorState;
use crate::reconcile::ViewModel;
use crate::render::{MapLauncher, Renderer};

/// A renderer that discards everything; for running the monitor headless.
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _view: &ViewModel) {}
    fn status(&mut self, _message: &str) {}
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub views: Vec<ViewModel>,
    pub statuses: Vec<String>,
    pub actuator: Vec<ActuatorState>,
}

/// Renderer that records every call. Clones share the same record, so a test
/// keeps one handle while the monitor thread owns the other.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_view(&self) -> Option<ViewModel> {
        self.recorded().views.last().cloned()
    }

    pub fn last_status(&self) -> Option<String> {
        self.recorded().statuses.last().cloned()
    }

    pub fn last_actuator(&self) -> Option<ActuatorState> {
        self.recorded().actuator.last().copied()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, view: &ViewModel) {
        self.recorded().views.push(view.clone());
    }

    fn actuator(&mut self, state: &ActuatorState) {
        self.recorded().actuator.push(*state);
    }

    fn status(&mut self, message: &str) {
        self.recorded().statuses.push(message.to_string());
    }
}

/// Map launcher that remembers where it was pointed.
#[derive(Debug, Default)]
pub struct RecordingMap {
    pub opened: Vec<(f64, f64)>,
}

impl MapLauncher for RecordingMap {
    fn open_external_map(&mut self, lat: f64, lon: f64) -> Result<(), BoxError> {
        self.opened.push((lat, lon));
        Ok(())
    }
}
