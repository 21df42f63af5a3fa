//! `From` implementations bridging `drain_config` types to `drain_core` types.
//!
//! Millisecond counts become `Duration`s here; validation already happened in
//! `drain_config::Config::validate`.

use std::time::Duration;

use crate::config::{
    EngineCfg, MonitorCfg, NormalizeCfg, PollCfg, RetriggerPolicy, TimerCfg,
};
use crate::gps::GeoPoint;
use crate::util::period_from_ms;

// ── Thresholds ───────────────────────────────────────────────────────────────

impl From<&drain_config::Thresholds> for EngineCfg {
    fn from(c: &drain_config::Thresholds) -> Self {
        Self {
            proximity_cm: c.proximity_cm,
            distance_sentinel_cm: c.distance_sentinel_cm,
        }
    }
}

// ── Normalizer defaults ──────────────────────────────────────────────────────

impl From<&drain_config::Config> for NormalizeCfg {
    fn from(c: &drain_config::Config) -> Self {
        Self {
            distance_sentinel_cm: c.thresholds.distance_sentinel_cm,
            fallback: GeoPoint::from(&c.gps),
        }
    }
}

/// Out-of-range coordinates fall back to the built-in site.
impl From<&drain_config::GpsCfg> for GeoPoint {
    fn from(c: &drain_config::GpsCfg) -> Self {
        GeoPoint::new(c.default_lat, c.default_lon).unwrap_or(GeoPoint::FALLBACK)
    }
}

// ── Actuator ─────────────────────────────────────────────────────────────────

impl From<drain_config::Retrigger> for RetriggerPolicy {
    fn from(r: drain_config::Retrigger) -> Self {
        match r {
            drain_config::Retrigger::Edge => RetriggerPolicy::Edge,
            drain_config::Retrigger::Level => RetriggerPolicy::Level,
        }
    }
}

impl From<&drain_config::ActuatorCfg> for TimerCfg {
    fn from(c: &drain_config::ActuatorCfg) -> Self {
        Self {
            on_duration: period_from_ms(c.on_duration_ms),
            cooldown: Duration::from_millis(c.cooldown_ms),
            retrigger: c.retrigger.into(),
        }
    }
}

// ── Poll ─────────────────────────────────────────────────────────────────────

impl From<&drain_config::PollCfg> for PollCfg {
    fn from(c: &drain_config::PollCfg) -> Self {
        Self {
            period: period_from_ms(c.period_ms),
        }
    }
}

impl From<&drain_config::Config> for MonitorCfg {
    fn from(c: &drain_config::Config) -> Self {
        Self {
            normalize: NormalizeCfg::from(c),
            engine: EngineCfg::from(&c.thresholds),
            timer: TimerCfg::from(&c.actuator),
            poll: PollCfg::from(&c.poll),
        }
    }
}
