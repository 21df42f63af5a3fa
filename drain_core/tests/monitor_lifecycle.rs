//! End-to-end runs of the monitor thread against the in-memory store.
//!
//! Verifies that:
//! - a blockage in auto mode runs the servo for the on-duration exactly once
//! - an operator `servo_off` cancels the pending automatic off
//! - transport faults become status lines and keep the last view
//! - the thread is joined on stop/drop and stop is idempotent
use drain_core::config::{MonitorCfg, PollCfg, TimerCfg};
use drain_core::mocks::RecordingRenderer;
use drain_core::monitor::NO_DATA_STATUS;
use drain_core::{DrainError, Monitor};
use drain_store::MemoryStore;
use drain_traits::clock::MonotonicClock;
use drain_traits::{ActuatorField, ServoControl};
use serde_json::json;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(5);

/// Poll `ready` until it holds or `timeout` expires.
fn wait_until(
    mut ready: impl FnMut() -> bool,
    timeout: Duration,
    poll: Duration,
) -> Result<(), String> {
    let deadline = Instant::now() + timeout;
    while !ready() {
        if Instant::now() >= deadline {
            return Err(format!("condition not met within {timeout:?}"));
        }
        std::thread::sleep(poll);
    }
    Ok(())
}

fn cfg(on_ms: u64) -> MonitorCfg {
    MonitorCfg {
        timer: TimerCfg {
            on_duration: Duration::from_millis(on_ms),
            ..TimerCfg::default()
        },
        poll: PollCfg {
            period: Duration::from_millis(50),
        },
        ..MonitorCfg::default()
    }
}

fn blocked_record(ts: u64) -> serde_json::Value {
    json!({
        "data": {"water_levels": [1, 1, 0], "blockage_type": "Debris"},
        "alert": "None",
        "timestamp": ts,
    })
}

fn auto_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.set_servo_control(ServoControl {
        servo_on: false,
        auto_mode: true,
    });
    store
}

#[test]
fn blockage_in_auto_mode_runs_servo_once() {
    let store = auto_store();
    let renderer = RecordingRenderer::new();
    let mut monitor = Monitor::spawn(
        store.clone(),
        renderer.clone(),
        cfg(150),
        MonotonicClock::new(),
    )
    .unwrap();

    store.push_record("-a", blocked_record(1));
    wait_until(|| store.writes().len() >= 2, WAIT, POLL).unwrap();
    assert_eq!(
        store.writes(),
        vec![(ActuatorField::ServoOn, true), (ActuatorField::ServoOn, false)]
    );
    assert!(!store.servo_control().servo_on);

    // The blockage persists: the episode is latched, so no second run.
    store.push_record("-b", blocked_record(2));
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(store.writes().len(), 2);

    let view = renderer.last_view().unwrap();
    assert_eq!(view.alert.text, "Blockage Detected: Debris");
    assert_eq!(view.timestamp_s, 2);

    let report = monitor.stop();
    assert_eq!(report.runs_started, 1);
    assert_eq!(report.runs_stopped, 1);
    assert!(report.snapshots >= 2);
}

#[test]
fn operator_servo_off_cancels_the_auto_off() {
    let store = auto_store();
    let renderer = RecordingRenderer::new();
    let mut monitor = Monitor::spawn(
        store.clone(),
        renderer.clone(),
        cfg(60_000),
        MonotonicClock::new(),
    )
    .unwrap();

    store.push_record("-a", blocked_record(1));
    wait_until(|| store.servo_control().servo_on, WAIT, POLL).unwrap();
    wait_until(
        || renderer.last_actuator().is_some_and(|s| s.running_since.is_some()),
        WAIT,
        POLL,
    )
    .unwrap();

    store.set_servo_control(ServoControl {
        servo_on: false,
        auto_mode: true,
    });
    wait_until(
        || renderer.last_actuator().is_some_and(|s| !s.servo_on && s.running_since.is_none()),
        WAIT,
        POLL,
    )
    .unwrap();

    let report = monitor.stop();
    assert_eq!(report.runs_cancelled, 1);
    assert_eq!(report.runs_stopped, 0);
    assert_eq!(store.writes(), vec![(ActuatorField::ServoOn, true)]);
}

#[test]
fn failed_start_is_reported_as_status() {
    let store = auto_store();
    store.reject_writes(Some("permission denied"));
    let renderer = RecordingRenderer::new();
    let _monitor = Monitor::spawn(store.clone(), renderer.clone(), cfg(100), MonotonicClock::new())
        .unwrap();

    store.push_record("-a", blocked_record(1));
    wait_until(
        || {
            renderer
                .last_status()
                .is_some_and(|s| s.starts_with("actuator write failed (servo_on = true)"))
        },
        WAIT,
        POLL,
    )
    .unwrap();
    assert!(store.writes().is_empty());
    assert!(!renderer.last_actuator().is_some_and(|s| s.servo_on));
}

#[test]
fn transport_fault_keeps_last_view() {
    let store = MemoryStore::new();
    store.push_record("-a", json!({"data": {"distance1": 3.0}, "timestamp": 7}));
    let renderer = RecordingRenderer::new();
    let _monitor = Monitor::spawn(
        store.clone(),
        renderer.clone(),
        MonitorCfg::default(),
        MonotonicClock::new(),
    )
    .unwrap();

    wait_until(|| renderer.last_view().is_some(), WAIT, POLL).unwrap();
    let before = renderer.last_view().unwrap();
    assert_eq!(before.alert.text, "No alerts; Proximity Alert");

    store.inject_fault("permission revoked");
    wait_until(
        || renderer.last_status().as_deref() == Some("Store error: permission revoked"),
        WAIT,
        POLL,
    )
    .unwrap();
    assert_eq!(renderer.last_view(), Some(before));
}

#[test]
fn empty_store_reports_no_data() {
    let store = MemoryStore::new();
    let renderer = RecordingRenderer::new();
    let _monitor = Monitor::spawn(store, renderer.clone(), cfg(100), MonotonicClock::new()).unwrap();
    wait_until(
        || renderer.last_status().as_deref() == Some(NO_DATA_STATUS),
        WAIT,
        POLL,
    )
    .unwrap();
    assert!(renderer.last_view().is_none());
}

#[test]
fn offline_store_fails_spawn_with_transport_error() {
    let store = MemoryStore::new();
    store.set_offline(Some("no network"));
    let err = Monitor::spawn(
        store,
        RecordingRenderer::new(),
        MonitorCfg::default(),
        MonotonicClock::new(),
    )
    .err()
    .unwrap();
    match err.downcast_ref::<DrainError>() {
        Some(DrainError::Transport(msg)) => assert!(msg.contains("no network")),
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[test]
fn stop_is_idempotent_and_drop_joins() {
    let store = MemoryStore::new();
    let mut monitor =
        Monitor::spawn(store.clone(), RecordingRenderer::new(), cfg(100), MonotonicClock::new())
            .unwrap();
    assert!(monitor.is_running());
    let first = monitor.stop();
    assert!(!monitor.is_running());
    assert_eq!(monitor.stop(), first);
    drop(monitor);

    for _ in 0..10 {
        let m = Monitor::spawn(store.clone(), RecordingRenderer::new(), cfg(100), MonotonicClock::new())
            .unwrap();
        drop(m);
    }
    // Subscriptions died with their threads; the next delivery prunes them.
    store.push_record("-x", json!({}));
    store.set_servo_control(ServoControl::default());
    assert_eq!(store.subscriber_counts(), (0, 0));
}
