//! Presentation seams. The core hands finished view models and status lines
//! out through these traits and never formats a widget itself.
use drain_traits::BoxError;

use crate::actuator::ActuatorState;
use crate::reconcile::ViewModel;

pub trait Renderer {
    fn render(&mut self, view: &ViewModel);

    /// Local actuator state changed (toggle echo, timer transition).
    fn actuator(&mut self, _state: &ActuatorState) {}

    /// Transport or actuator fault, shown next to the last good view.
    fn status(&mut self, message: &str);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, view: &ViewModel) {
        (**self).render(view);
    }

    fn actuator(&mut self, state: &ActuatorState) {
        (**self).actuator(state);
    }

    fn status(&mut self, message: &str) {
        (**self).status(message);
    }
}

pub trait MapLauncher {
    fn open_external_map(&mut self, lat: f64, lon: f64) -> Result<(), BoxError>;
}
