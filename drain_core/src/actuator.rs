//! Actuator timer: executes `TurnOn` under an on-duration / cooldown
//! discipline and is the only writer of actuator commands.
//!
//! ```text
//!   Idle --TurnOn, write ok--> Running{deadline = now + on_duration}
//!   Running --tick(now >= deadline), write ok--> Idle (cooldown armed)
//!   Running --echo servo_on=false after our own true echo--> Idle (no write)
//! ```
//!
//! The timer never reads a clock. Every call is stamped with `now` by the
//! caller, so the monitor thread and the tests drive it the same way.
use std::time::Instant;

use drain_traits::{ActuatorField, ActuatorStore, ServoControl};
use serde::Serialize;

use crate::config::{RetriggerPolicy, TimerCfg};
use crate::error::DrainError;
use crate::reconcile::ActuatorCommand;
use crate::status::{IgnoreReason, Transition};
use crate::store_error::write_failure;

/// Local view of the actuator, owned by the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ActuatorState {
    pub servo_on: bool,
    pub auto_mode: bool,
    /// Start of the automatic run in progress.
    #[serde(skip)]
    pub running_since: Option<Instant>,
    /// Set when an automatic run fired for the current blockage episode.
    pub episode_latched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running {
        since: Instant,
        /// `None` once cancelled or after a failed off-write.
        deadline: Option<Instant>,
        /// The store has echoed our `servo_on = true`.
        confirmed: bool,
    },
}

pub struct ActuatorTimer<S: ActuatorStore> {
    store: S,
    cfg: TimerCfg,
    state: ActuatorState,
    phase: TimerPhase,
    cooldown_until: Option<Instant>,
}

impl<S: ActuatorStore> ActuatorTimer<S> {
    pub fn new(store: S, cfg: TimerCfg) -> Self {
        Self {
            store,
            cfg,
            state: ActuatorState::default(),
            phase: TimerPhase::Idle,
            cooldown_until: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn cfg(&self) -> &TimerCfg {
        &self.cfg
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    /// Pending automatic-off instant, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            TimerPhase::Running { deadline, .. } => deadline,
            TimerPhase::Idle => None,
        }
    }

    /// Disarm the pending deadline. Returns whether one was pending; calling
    /// it again, or after the deadline fired, is a no-op.
    pub fn cancel(&mut self) -> bool {
        match &mut self.phase {
            TimerPhase::Running { deadline, .. } if deadline.is_some() => {
                *deadline = None;
                tracing::debug!("actuator deadline cancelled");
                true
            }
            _ => false,
        }
    }

    /// Execute an engine command.
    ///
    /// On a failed write the local state is left untouched and the error is
    /// returned; nothing is retried.
    pub fn apply(&mut self, cmd: ActuatorCommand, now: Instant) -> Result<Transition, DrainError> {
        if cmd == ActuatorCommand::NoChange {
            return Ok(Transition::Unchanged);
        }
        if self.is_running() {
            return Ok(Transition::Ignored(IgnoreReason::AlreadyRunning));
        }
        if self.state.episode_latched {
            return Ok(Transition::Ignored(IgnoreReason::EpisodeLatched));
        }
        if let Some(until) = self.cooldown_until {
            if now < until {
                return Ok(Transition::Ignored(IgnoreReason::CoolingDown { until }));
            }
            self.cooldown_until = None;
        }

        if let Err(e) = self.store.write_actuator_command(ActuatorField::ServoOn, true) {
            let err = write_failure(ActuatorField::ServoOn, true, &*e);
            tracing::warn!(error = %err, "automatic servo start failed");
            return Err(err);
        }

        let deadline = now + self.cfg.on_duration;
        self.phase = TimerPhase::Running {
            since: now,
            deadline: Some(deadline),
            confirmed: false,
        };
        self.state.servo_on = true;
        self.state.running_since = Some(now);
        if self.cfg.retrigger == RetriggerPolicy::Edge {
            self.state.episode_latched = true;
        }
        tracing::info!(
            on_ms = crate::util::ms_between(now, deadline),
            "servo started for blockage"
        );
        Ok(Transition::Started { deadline })
    }

    /// Fire the automatic off if its deadline has been reached.
    pub fn tick(&mut self, now: Instant) -> Result<Transition, DrainError> {
        let TimerPhase::Running {
            since,
            deadline: Some(deadline),
            confirmed,
        } = self.phase
        else {
            return Ok(Transition::Unchanged);
        };
        if now < deadline {
            return Ok(Transition::Unchanged);
        }

        if let Err(e) = self
            .store
            .write_actuator_command(ActuatorField::ServoOn, false)
        {
            // Stay Running without a deadline; the false echo ends the run.
            self.phase = TimerPhase::Running {
                since,
                deadline: None,
                confirmed,
            };
            let err = write_failure(ActuatorField::ServoOn, false, &*e);
            tracing::warn!(error = %err, "automatic servo stop failed");
            return Err(err);
        }

        self.finish_run();
        if !self.cfg.cooldown.is_zero() {
            self.cooldown_until = Some(now + self.cfg.cooldown);
        }
        tracing::info!(ran_ms = crate::util::ms_between(since, now), "servo stopped");
        Ok(Transition::Stopped)
    }

    /// Absorb an echo of the store's control record.
    pub fn observe(&mut self, ctrl: ServoControl) -> Transition {
        if self.state.auto_mode != ctrl.auto_mode {
            tracing::info!(auto_mode = ctrl.auto_mode, "auto mode changed");
            self.state.auto_mode = ctrl.auto_mode;
        }

        match self.phase {
            TimerPhase::Running {
                since, deadline, ..
            } if ctrl.servo_on => {
                self.phase = TimerPhase::Running {
                    since,
                    deadline,
                    confirmed: true,
                };
                Transition::Unchanged
            }
            TimerPhase::Running {
                confirmed,
                deadline,
                ..
            } => {
                // Before our own true echo arrives, a false echo is stale.
                if !confirmed && deadline.is_some() {
                    return Transition::Unchanged;
                }
                self.finish_run();
                tracing::info!("servo turned off externally; automatic off cancelled");
                Transition::Cancelled
            }
            TimerPhase::Idle => {
                self.state.servo_on = ctrl.servo_on;
                Transition::Unchanged
            }
        }
    }

    /// Track blockage episodes: the latch clears once a snapshot shows none.
    pub fn observe_diagnosis(&mut self, is_blockage: bool) {
        if !is_blockage && self.state.episode_latched {
            self.state.episode_latched = false;
            tracing::debug!("blockage cleared; episode latch released");
        }
    }

    fn finish_run(&mut self) {
        self.phase = TimerPhase::Idle;
        self.state.servo_on = false;
        self.state.running_since = None;
    }
}
