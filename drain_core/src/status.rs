//! Outcome of feeding one event into the actuator timer.
use std::time::Instant;

/// Why a `TurnOn` was not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A run is in progress; it is neither restarted nor extended.
    AlreadyRunning,
    /// This blockage episode already had its automatic run.
    EpisodeLatched,
    /// The last automatic run ended too recently.
    CoolingDown { until: Instant },
}

/// Public status of a single timer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to do.
    Unchanged,
    Ignored(IgnoreReason),
    /// `servo_on = true` written; the automatic off fires at `deadline`.
    Started { deadline: Instant },
    /// The deadline fired and `servo_on = false` was written.
    Stopped,
    /// An external `servo_on = false` ended the run; nothing was written.
    Cancelled,
}

impl Transition {
    pub fn is_started(&self) -> bool {
        matches!(self, Transition::Started { .. })
    }
}
