//! Configuration types for the reconciliation core.
//!
//! These are the runtime structs consumed by the normalizer, the engine and
//! the actuator timer. They are separate from the TOML-deserialized config in
//! `drain_config`; see `conversions` for the mapping.
use std::time::Duration;

use crate::gps::GeoPoint;

/// Sonar distance below which the proximity alert fires (cm).
pub const PROXIMITY_THRESHOLD_CM: f64 = 5.0;
/// Stand-in for a missing sonar distance; far outside the proximity range.
pub const DISTANCE_SENTINEL_CM: f64 = 999.0;
/// How long an automatic run keeps the servo energized.
pub const SERVO_ON_DURATION: Duration = Duration::from_secs(10);
/// Period of the one-shot refresh that runs alongside the push feed.
pub const POLL_PERIOD: Duration = Duration::from_secs(2);

/// Defaults substituted by the snapshot normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeCfg {
    pub distance_sentinel_cm: f64,
    /// Coordinate used when the rig reports no GPS lock or garbage.
    pub fallback: GeoPoint,
}

impl Default for NormalizeCfg {
    fn default() -> Self {
        Self {
            distance_sentinel_cm: DISTANCE_SENTINEL_CM,
            fallback: GeoPoint::FALLBACK,
        }
    }
}

/// Reconciliation thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineCfg {
    /// Strict: a distance equal to the threshold is safe.
    pub proximity_cm: f64,
    /// Distances at or above this render as "no reading".
    pub distance_sentinel_cm: f64,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            proximity_cm: PROXIMITY_THRESHOLD_CM,
            distance_sentinel_cm: DISTANCE_SENTINEL_CM,
        }
    }
}

/// When a persisting blockage may fire the actuator again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetriggerPolicy {
    /// At most one automatic run per blockage episode; the episode ends when
    /// a snapshot shows no blockage.
    #[default]
    Edge,
    /// Fire again whenever the timer is idle and the blockage is still diagnosed.
    Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerCfg {
    pub on_duration: Duration,
    /// Zero disables the cooldown.
    pub cooldown: Duration,
    pub retrigger: RetriggerPolicy,
}

impl Default for TimerCfg {
    fn default() -> Self {
        Self {
            on_duration: SERVO_ON_DURATION,
            cooldown: Duration::ZERO,
            retrigger: RetriggerPolicy::Edge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollCfg {
    pub period: Duration,
}

impl Default for PollCfg {
    fn default() -> Self {
        Self {
            period: POLL_PERIOD,
        }
    }
}

/// Everything the monitor loop needs, bundled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonitorCfg {
    pub normalize: NormalizeCfg,
    pub engine: EngineCfg,
    pub timer: TimerCfg,
    pub poll: PollCfg,
}
