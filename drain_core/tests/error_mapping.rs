use drain_core::DrainError;
use drain_core::store_error::{describe_store_error, map_store_error, write_failure};
use drain_store::StoreError;
use drain_traits::{ActuatorField, TransportFault};
use rstest::rstest;

#[rstest]
#[case(StoreError::Unavailable("db.json does not exist".into()), "store unavailable (db.json does not exist)")]
#[case(StoreError::WriteRejected("read-only".into()), "write rejected (read-only)")]
#[case(StoreError::Malformed("root is not an object".into()), "store document is malformed: root is not an object")]
fn store_errors_get_short_descriptions(#[case] e: StoreError, #[case] expected: &str) {
    assert_eq!(describe_store_error(&e), expected);
}

#[test]
fn boxed_errors_map_to_transport() {
    let boxed: Box<dyn std::error::Error + Send + Sync> =
        Box::new(TransportFault("listener cancelled".into()));
    match map_store_error(&*boxed) {
        DrainError::Transport(msg) => assert_eq!(msg, "listener cancelled"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn write_failures_name_field_and_value() {
    let e = StoreError::WriteRejected("offline".into());
    let err = write_failure(ActuatorField::AutoMode, false, &e);
    assert_eq!(
        err.to_string(),
        "actuator write failed (auto_mode = false): write rejected (offline)"
    );
}
