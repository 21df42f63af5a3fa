#![no_main]
use drain_core::config::{EngineCfg, NormalizeCfg};
use drain_core::{ActuatorState, normalize, reconcile, select_latest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let ncfg = NormalizeCfg::default();
    let ecfg = EngineCfg::default();

    // Total over arbitrary text.
    let snap = drain_core::normalize_str(data, &ncfg);
    let rec = reconcile(&snap, &ActuatorState::default(), &ecfg);
    assert_eq!(rec.diagnosis.is_blockage, rec.diagnosis.blocked_chamber.is_some());

    // Keyed collections go through latest-record selection first.
    if let Ok(raw) = serde_json::from_str::<serde_json::Value>(data)
        && let Some(latest) = select_latest(&raw)
    {
        let a = normalize(latest, &ncfg);
        let b = normalize(latest, &ncfg);
        assert_eq!(a, b);
    }
});
