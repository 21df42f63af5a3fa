use drain_core::Monitor;
use drain_core::config::{EngineCfg, MonitorCfg, PollCfg, TimerCfg};
use drain_core::error::BuildError;
use drain_core::mocks::NullRenderer;
use drain_store::MemoryStore;
use rstest::rstest;
use std::time::Duration;

#[rstest]
fn builder_missing_store_yields_typed_build_error() {
    let err = Monitor::builder()
        // missing with_store()
        .with_renderer(NullRenderer)
        .try_build()
        .err()
        .expect("should fail with MissingStore");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingStore) => {}
        other => panic!("expected MissingStore, got: {other:?}"),
    }
}

#[rstest]
fn builder_missing_renderer_yields_typed_build_error() {
    let err = Monitor::builder()
        .with_store(MemoryStore::new())
        .try_build()
        .err()
        .expect("should fail with MissingRenderer");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingRenderer) => {}
        other => panic!("expected MissingRenderer, got: {other:?}"),
    }
}

#[rstest]
#[case::zero_poll(MonitorCfg { poll: PollCfg { period: Duration::ZERO }, ..MonitorCfg::default() }, "poll period")]
#[case::zero_on(MonitorCfg { timer: TimerCfg { on_duration: Duration::ZERO, ..TimerCfg::default() }, ..MonitorCfg::default() }, "on-duration")]
#[case::nan_proximity(MonitorCfg { engine: EngineCfg { proximity_cm: f64::NAN, ..EngineCfg::default() }, ..MonitorCfg::default() }, "proximity")]
#[case::sentinel_below_threshold(MonitorCfg { engine: EngineCfg { proximity_cm: 5.0, distance_sentinel_cm: 4.0 }, ..MonitorCfg::default() }, "sentinel")]
fn builder_rejects_invalid_config(#[case] cfg: MonitorCfg, #[case] needle: &str) {
    let err = Monitor::builder()
        .with_store(MemoryStore::new())
        .with_renderer(NullRenderer)
        .with_config(cfg)
        .build()
        .err()
        .expect("invalid config must be rejected");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn builder_with_everything_starts_and_stops() {
    let mut monitor = Monitor::builder()
        .with_store(MemoryStore::new())
        .with_renderer(NullRenderer)
        .with_clock(Box::new(drain_traits::clock::MonotonicClock::new()))
        .build()
        .expect("valid builder");
    assert!(monitor.is_running());
    monitor.stop();
}
