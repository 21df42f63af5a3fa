use drain_store::FileStore;
use drain_traits::{ActuatorField, ActuatorStore, ServoControl, SnapshotSource};
use serde_json::json;
use std::time::Duration;
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn snapshot_watcher_delivers_changes_only() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("db.json"), Duration::from_millis(5));
    store.append_record("r1", json!({"timestamp": 1})).unwrap();

    let sub = store.subscribe_snapshots().unwrap();
    let first = sub.next_timeout(WAIT).expect("initial delivery").unwrap();
    assert_eq!(first["r1"]["timestamp"], 1);

    // Unchanged document: nothing new within a few watch periods.
    assert!(sub.next_timeout(Duration::from_millis(40)).is_none());

    store.append_record("r2", json!({"timestamp": 2})).unwrap();
    let second = sub.next_timeout(WAIT).expect("change delivery").unwrap();
    assert_eq!(second["r2"]["timestamp"], 2);
}

#[test]
fn written_command_is_observed_by_actuator_subscription() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("db.json"), Duration::from_millis(5));
    store
        .write_actuator_command(ActuatorField::AutoMode, false)
        .unwrap();

    let sub = store.subscribe_actuator_state().unwrap();
    let initial = sub.next_timeout(WAIT).unwrap().unwrap();
    assert_eq!(initial, ServoControl::default());

    store
        .write_actuator_command(ActuatorField::ServoOn, true)
        .unwrap();
    let echoed = sub.next_timeout(WAIT).unwrap().unwrap();
    assert!(echoed.servo_on);
    assert!(!echoed.auto_mode);
}

#[test]
fn own_writes_are_echoed_even_when_they_flip_back_between_watch_reads() {
    let dir = tempdir().unwrap();
    // Long enough that the watcher cannot re-read the file during the writes.
    let mut store = FileStore::open(dir.path().join("db.json"), Duration::from_millis(500));
    store
        .write_actuator_command(ActuatorField::AutoMode, true)
        .unwrap();

    let sub = store.subscribe_actuator_state().unwrap();
    let initial = sub.next_timeout(WAIT).unwrap().unwrap();
    assert!(initial.auto_mode);
    assert!(!initial.servo_on);

    for on in [true, false, true] {
        store
            .write_actuator_command(ActuatorField::ServoOn, on)
            .unwrap();
    }
    let seen: Vec<bool> = (0..3)
        .map(|_| {
            sub.next_timeout(Duration::from_millis(100))
                .expect("local echo")
                .unwrap()
                .servo_on
        })
        .collect();
    assert_eq!(seen, vec![true, false, true]);
}

#[test]
fn dropped_actuator_subscription_does_not_fail_writes() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("db.json"), Duration::from_millis(5));
    drop(store.subscribe_actuator_state().unwrap());
    store
        .write_actuator_command(ActuatorField::ServoOn, true)
        .unwrap();
    assert!(store.servo_control().unwrap().servo_on);
}

#[test]
fn unreadable_document_is_reported_in_band_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, "not json").unwrap();
    let mut store = FileStore::open(&path, Duration::from_millis(5));

    let sub = store.subscribe_snapshots().unwrap();
    let fault = sub.next_timeout(WAIT).unwrap().unwrap_err();
    assert!(fault.to_string().contains("json"));
    // Same fault is not repeated every watch period.
    assert!(sub.next_timeout(Duration::from_millis(40)).is_none());

    let tmp = dir.path().join("db.json.next");
    std::fs::write(&tmp, r#"{"sensor_data": {"r": {"timestamp": 5}}}"#).unwrap();
    std::fs::rename(&tmp, &path).unwrap();
    let recovered = sub.next_timeout(WAIT).unwrap().unwrap();
    assert_eq!(recovered["r"]["timestamp"], 5);
}
