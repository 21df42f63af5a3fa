#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the drainage monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Every section is optional; an empty file yields the field defaults
//!   observed on the deployed rig (2 s poll, 10 s servo run, 5 cm proximity).
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fallback coordinate shown when the rig has no GPS lock.
pub const DEFAULT_LAT: f64 = 23.811_855;
pub const DEFAULT_LON: f64 = 90.357_140;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollCfg {
    /// Period of the one-shot refresh that runs alongside the push feed (ms).
    pub period_ms: u64,
}

impl Default for PollCfg {
    fn default() -> Self {
        Self { period_ms: 2_000 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Retrigger {
    /// One automatic run per blockage episode.
    #[default]
    Edge,
    /// Re-arm whenever idle while the blockage persists.
    Level,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActuatorCfg {
    /// How long an automatic run keeps the servo energized (ms).
    pub on_duration_ms: u64,
    /// Quiet period after an automatic run during which new runs are refused (ms, 0 disables).
    pub cooldown_ms: u64,
    pub retrigger: Retrigger,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            on_duration_ms: 10_000,
            cooldown_ms: 0,
            retrigger: Retrigger::Edge,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Sonar distance below which the proximity alert fires (cm, strict).
    pub proximity_cm: f64,
    /// Value substituted for a missing distance; must sit above `proximity_cm`.
    pub distance_sentinel_cm: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            proximity_cm: 5.0,
            distance_sentinel_cm: 999.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GpsCfg {
    pub default_lat: f64,
    pub default_lon: f64,
}

impl Default for GpsCfg {
    fn default() -> Self {
        Self {
            default_lat: DEFAULT_LAT,
            default_lon: DEFAULT_LON,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreCfg {
    /// JSON export used by the file-backed store.
    pub path: PathBuf,
    /// How often the file store re-reads the export for changes (ms).
    pub watch_ms: u64,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("var/drain_store.json"),
            watch_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub poll: PollCfg,
    pub actuator: ActuatorCfg,
    pub thresholds: Thresholds,
    pub gps: GpsCfg,
    pub store: StoreCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Poll
        if self.poll.period_ms == 0 {
            eyre::bail!("poll.period_ms must be >= 1");
        }
        if self.poll.period_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("poll.period_ms is unreasonably large (>24h)");
        }

        // Actuator
        if self.actuator.on_duration_ms == 0 {
            eyre::bail!("actuator.on_duration_ms must be >= 1");
        }
        if self.actuator.on_duration_ms > 10 * 60 * 1000 {
            eyre::bail!("actuator.on_duration_ms is unreasonably large (>10min)");
        }
        if self.actuator.cooldown_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("actuator.cooldown_ms is unreasonably large (>24h)");
        }

        // Thresholds
        let t = &self.thresholds;
        if !t.proximity_cm.is_finite() || t.proximity_cm <= 0.0 {
            eyre::bail!("thresholds.proximity_cm must be a finite value > 0");
        }
        if !t.distance_sentinel_cm.is_finite() {
            eyre::bail!("thresholds.distance_sentinel_cm must be finite");
        }
        if t.distance_sentinel_cm <= t.proximity_cm {
            eyre::bail!("thresholds.distance_sentinel_cm must be > thresholds.proximity_cm");
        }

        // GPS
        if !(-90.0..=90.0).contains(&self.gps.default_lat) {
            eyre::bail!("gps.default_lat must be in [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.gps.default_lon) {
            eyre::bail!("gps.default_lon must be in [-180, 180]");
        }

        // Store
        if self.store.watch_ms == 0 {
            eyre::bail!("store.watch_ms must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        Ok(())
    }
}
