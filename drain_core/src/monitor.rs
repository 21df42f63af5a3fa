//! Monitor runtime: one thread owns the engine and the actuator timer.
//!
//! The thread multiplexes five event sources with `select!`: the stop
//! channel, the snapshot feed, the actuator echo feed, the poll tick and the
//! pending on-duration deadline. Every `ActuatorState` mutation happens on
//! that thread, so nothing is locked.
//!
//! Safety: each `Monitor` spawns exactly one thread, joined on `stop()` or
//! drop. Stopping cancels the poll tick and any pending deadline.
use crossbeam_channel as xch;
use drain_traits::clock::Clock;
use drain_traits::{ActuatorStore, Delivery, ServoControl, SnapshotSource};
use eyre::WrapErr;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::MonitorCfg;
use crate::engine::{Engine, Ingest};
use crate::error::{DrainError, Result};
use crate::render::Renderer;
use crate::status::Transition;
use crate::store_error::map_store_error;

/// Status line shown when the store holds no sensor record.
pub const NO_DATA_STATUS: &str = "No sensor data available";

/// Counters accumulated by the monitor thread, returned on stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub snapshots: u64,
    pub echoes: u64,
    pub polls: u64,
    pub faults: u64,
    pub runs_started: u64,
    pub runs_stopped: u64,
    pub runs_cancelled: u64,
}

impl MonitorReport {
    fn count(&mut self, t: Transition) {
        match t {
            Transition::Started { .. } => self.runs_started += 1,
            Transition::Stopped => self.runs_stopped += 1,
            Transition::Cancelled => self.runs_cancelled += 1,
            Transition::Unchanged | Transition::Ignored(_) => {}
        }
    }
}

pub struct Monitor {
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    stop_tx: Option<xch::Sender<()>>,
    join_handle: Option<std::thread::JoinHandle<MonitorReport>>,
    report: Option<MonitorReport>,
}

impl Monitor {
    /// Subscribe to both feeds and start the monitor thread.
    ///
    /// Subscription failures are returned here; faults after that are shown
    /// through `Renderer::status` and never stop the loop.
    pub fn spawn<S, R, C>(mut store: S, renderer: R, cfg: MonitorCfg, clock: C) -> Result<Self>
    where
        S: SnapshotSource + ActuatorStore + Send + 'static,
        R: Renderer + Send + 'static,
        C: Clock + Send + 'static,
    {
        let snaps = store
            .subscribe_snapshots()
            .map_err(|e| eyre::Report::new(map_store_error(&*e)))
            .wrap_err("subscribing to sensor data")?
            .into_receiver();
        let ctrls = store
            .subscribe_actuator_state()
            .map_err(|e| eyre::Report::new(map_store_error(&*e)))
            .wrap_err("subscribing to actuator state")?
            .into_receiver();

        let (stop_tx, stop_rx) = xch::bounded::<()>(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::Builder::new()
            .name("drain-monitor".into())
            .spawn(move || {
                let mut worker = Worker {
                    engine: Engine::new(store, &cfg),
                    renderer,
                    clock,
                    report: MonitorReport::default(),
                };
                worker.run(&cfg, &stop_rx, &shutdown_clone, snaps, ctrls);
                worker.shutdown();
                tracing::trace!("monitor thread exiting cleanly");
                worker.report
            })
            .wrap_err("spawning monitor thread")?;

        tracing::info!(
            poll_ms = u64::try_from(cfg.poll.period.as_millis()).unwrap_or(u64::MAX),
            on_ms = u64::try_from(cfg.timer.on_duration.as_millis()).unwrap_or(u64::MAX),
            "monitor started"
        );
        Ok(Self {
            shutdown,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
            report: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the thread and return its counters. Calling it again returns the
    /// same report without side effects.
    pub fn stop(&mut self) -> MonitorReport {
        self.shutdown.store(true, Ordering::Relaxed);
        // Disconnecting the stop channel wakes the select immediately.
        self.stop_tx.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(report) => {
                    tracing::trace!("monitor thread joined successfully");
                    self.report = Some(report);
                }
                Err(e) => {
                    tracing::warn!(?e, "monitor thread panicked during shutdown");
                }
            }
        }
        self.report.unwrap_or_default()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Event {
    Stop,
    Snapshot(std::result::Result<Delivery<Value>, xch::RecvError>),
    Echo(std::result::Result<Delivery<ServoControl>, xch::RecvError>),
    Poll,
    Deadline,
}

struct Worker<S: ActuatorStore, R, C> {
    engine: Engine<S>,
    renderer: R,
    clock: C,
    report: MonitorReport,
}

impl<S, R, C> Worker<S, R, C>
where
    S: SnapshotSource + ActuatorStore,
    R: Renderer,
    C: Clock,
{
    fn run(
        &mut self,
        cfg: &MonitorCfg,
        stop_rx: &xch::Receiver<()>,
        shutdown: &AtomicBool,
        mut snaps: xch::Receiver<Delivery<Value>>,
        mut ctrls: xch::Receiver<Delivery<ServoControl>>,
    ) {
        let poll = xch::tick(cfg.poll.period);
        self.poll();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::debug!("monitor thread received shutdown signal");
                break;
            }
            // Map the clock's deadline onto a real timer; a test clock that
            // has not advanced just re-arms it.
            let deadline = match self.engine.deadline() {
                Some(d) => xch::after(d.saturating_duration_since(self.clock.now())),
                None => xch::never(),
            };

            let event = xch::select! {
                recv(stop_rx) -> _ => Event::Stop,
                recv(snaps) -> msg => Event::Snapshot(msg),
                recv(ctrls) -> msg => Event::Echo(msg),
                recv(poll) -> _ => Event::Poll,
                recv(deadline) -> _ => Event::Deadline,
            };
            match event {
                Event::Stop => break,
                Event::Snapshot(Ok(Ok(raw))) => self.snapshot(&raw),
                Event::Snapshot(Ok(Err(fault))) | Event::Echo(Ok(Err(fault))) => {
                    self.fault(&fault.to_string());
                }
                Event::Snapshot(Err(_)) => {
                    tracing::warn!("sensor feed closed; continuing on poll only");
                    snaps = xch::never();
                }
                Event::Echo(Ok(Ok(ctrl))) => self.echo(ctrl),
                Event::Echo(Err(_)) => {
                    tracing::warn!("actuator feed closed");
                    ctrls = xch::never();
                }
                Event::Poll => self.poll(),
                Event::Deadline => self.deadline(),
            }
        }
    }

    fn snapshot(&mut self, raw: &Value) {
        self.report.snapshots += 1;
        let ingest = self.engine.on_snapshot(raw, self.clock.now());
        self.ingest(ingest);
    }

    fn poll(&mut self) {
        self.report.polls += 1;
        match self.engine.refresh(self.clock.now()) {
            Ok(ingest) => self.ingest(ingest),
            Err(DrainError::Transport(msg)) => self.fault(&msg),
            Err(err) => self.fault(&err.to_string()),
        }
    }

    fn ingest(&mut self, ingest: Ingest) {
        let Ingest::Updated(step) = ingest else {
            self.renderer.status(NO_DATA_STATUS);
            return;
        };
        self.renderer.render(&step.view);
        self.report.count(step.transition);
        if step.transition.is_started() {
            self.renderer.actuator(self.engine.actuator_state());
        }
        if let Some(err) = step.fault {
            self.report.faults += 1;
            self.renderer.status(&err.to_string());
        }
    }

    fn echo(&mut self, ctrl: ServoControl) {
        self.report.echoes += 1;
        let t = self.engine.on_actuator(ctrl);
        self.report.count(t);
        self.renderer.actuator(self.engine.actuator_state());
    }

    fn deadline(&mut self) {
        let now = self.clock.now();
        match self.engine.on_deadline(now) {
            Ok(t) => {
                self.report.count(t);
                if t == Transition::Stopped {
                    self.renderer.actuator(self.engine.actuator_state());
                }
            }
            Err(err) => {
                self.report.faults += 1;
                self.renderer.status(&err.to_string());
            }
        }
    }

    fn fault(&mut self, msg: &str) {
        self.report.faults += 1;
        tracing::warn!(error = %msg, "store fault; keeping last view");
        self.renderer.status(&format!("Store error: {msg}"));
    }

    fn shutdown(&mut self) {
        if self.engine.cancel() {
            tracing::warn!("monitor stopped with the servo still running; automatic off cancelled");
        }
    }
}
