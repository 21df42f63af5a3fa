#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate errors are fine; panics are not.
    if let Ok(cfg) = drain_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // A config that validates must map onto core settings the builder accepts.
        let core = drain_core::MonitorCfg::from(&cfg);
        assert!(drain_core::builder::validate_cfg(&core).is_ok());
    }
});
