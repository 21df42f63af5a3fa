//! Snapshot normalizer: loosely-typed store record -> `NormalizedSnapshot`.
//!
//! The rig writes records shaped like
//!
//! ```json
//! { "data": { "water_levels": [1, 1, 0], "distance1": 12.5, "distance2": 40.0,
//!             "mq8": 0.42, "temp": 27.3, "ir": 0, "flame": 0,
//!             "blockage_type": "Debris", "blocked_chamber": 3 },
//!   "gps": "23.811855,90.357140", "alert": "None", "timestamp": 1718000000 }
//! ```
//!
//! Any field may be missing. A field with the wrong type or an out-of-range
//! value is treated exactly like a missing one and replaced by its default;
//! normalization never fails.
use serde::Serialize;
use serde_json::Value;

use crate::config::NormalizeCfg;
use crate::gps::{self, GpsFix};

/// Literal the rig writes into `alert` when nothing is wrong.
pub const ALERT_NONE: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WaterLevel {
    #[default]
    Empty,
    Full,
}

impl WaterLevel {
    pub fn is_full(self) -> bool {
        matches!(self, WaterLevel::Full)
    }
}

/// Chamber number, 1..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChamberIndex(u8);

impl ChamberIndex {
    pub const COUNT: usize = 3;
    pub const ALL: [ChamberIndex; 3] = [ChamberIndex(1), ChamberIndex(2), ChamberIndex(3)];

    pub fn new(n: u8) -> Option<Self> {
        (1..=3).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in per-chamber arrays.
    pub fn slot(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl std::fmt::Display for ChamberIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fully-defaulted view of one sensor record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSnapshot {
    pub water_levels: [WaterLevel; 3],
    pub distance1_cm: f64,
    pub distance2_cm: f64,
    pub gas_volts: f64,
    pub temperature_c: f64,
    pub ir_detected: bool,
    pub flame_detected: bool,
    /// Blockage kind as reported by the rig, if any.
    pub blockage_type: Option<String>,
    /// Blocked chamber as reported by the rig, if any.
    pub blocked_chamber: Option<ChamberIndex>,
    /// Rig-level alert text; `"None"` when absent.
    pub alert: String,
    pub gps: GpsFix,
    /// Seconds; 0 when absent.
    pub timestamp_s: u64,
}

impl NormalizedSnapshot {
    /// The snapshot produced from a record with every field missing.
    pub fn defaults(cfg: &NormalizeCfg) -> Self {
        Self {
            water_levels: [WaterLevel::Empty; 3],
            distance1_cm: cfg.distance_sentinel_cm,
            distance2_cm: cfg.distance_sentinel_cm,
            gas_volts: 0.0,
            temperature_c: 0.0,
            ir_detected: false,
            flame_detected: false,
            blockage_type: None,
            blocked_chamber: None,
            alert: ALERT_NONE.to_string(),
            gps: GpsFix::fallback(cfg.fallback),
            timestamp_s: 0,
        }
    }
}

fn number(v: Option<&Value>) -> Option<f64> {
    v.and_then(Value::as_f64).filter(|x| x.is_finite())
}

/// 0/1 integer flag. Anything else is malformed.
fn flag(v: Option<&Value>) -> Option<bool> {
    match v.and_then(Value::as_u64)? {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

fn text(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str)
}

fn timestamp(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    if let Some(t) = v.as_u64() {
        return Some(t);
    }
    // Fractional seconds are truncated; negatives are malformed.
    v.as_f64()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .map(|t| t as u64)
}

/// Element `i` of the water-level node. Sparse arrays come back from the
/// store as objects keyed by index, so both shapes are accepted.
fn water_level(node: Option<&Value>, i: usize) -> WaterLevel {
    let v = match node {
        Some(Value::Array(items)) => items.get(i),
        Some(Value::Object(map)) => map.get(&i.to_string()),
        _ => None,
    };
    match flag(v) {
        Some(true) => WaterLevel::Full,
        _ => WaterLevel::Empty,
    }
}

/// Normalize one sensor record. Total: never panics, never fails.
pub fn normalize(raw: &Value, cfg: &NormalizeCfg) -> NormalizedSnapshot {
    let mut snap = NormalizedSnapshot::defaults(cfg);
    let data = raw.get("data");
    let field = |name: &str| data.and_then(|d| d.get(name));

    let levels = field("water_levels");
    for (i, slot) in snap.water_levels.iter_mut().enumerate() {
        *slot = water_level(levels, i);
    }

    if let Some(d) = number(field("distance1")) {
        snap.distance1_cm = d;
    }
    if let Some(d) = number(field("distance2")) {
        snap.distance2_cm = d;
    }
    if let Some(v) = number(field("mq8")) {
        snap.gas_volts = v;
    }
    if let Some(t) = number(field("temp")) {
        snap.temperature_c = t;
    }
    snap.ir_detected = flag(field("ir")).unwrap_or(false);
    snap.flame_detected = flag(field("flame")).unwrap_or(false);

    snap.blockage_type = text(field("blockage_type"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    snap.blocked_chamber = field("blocked_chamber")
        .and_then(Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .and_then(ChamberIndex::new);

    if let Some(a) = text(raw.get("alert")) {
        snap.alert = a.to_string();
    }
    snap.gps = gps::resolve(text(raw.get("gps")), cfg.fallback);
    if let Some(t) = timestamp(raw.get("timestamp")) {
        snap.timestamp_s = t;
    }

    tracing::trace!(
        timestamp = snap.timestamp_s,
        levels = ?snap.water_levels,
        gps_locked = snap.gps.locked,
        "snapshot normalized"
    );
    snap
}

/// Normalize JSON text; unparseable text yields the all-defaults snapshot.
pub fn normalize_str(text: &str, cfg: &NormalizeCfg) -> NormalizedSnapshot {
    match serde_json::from_str::<Value>(text) {
        Ok(v) => normalize(&v, cfg),
        Err(e) => {
            tracing::debug!(error = %e, "unparseable snapshot text; using defaults");
            NormalizedSnapshot::defaults(cfg)
        }
    }
}

fn is_record(v: &Value) -> bool {
    ["data", "timestamp", "alert", "gps"]
        .iter()
        .any(|k| v.get(k).is_some())
}

/// Pick the newest record out of the store's sensor node.
///
/// The node is either a single record or a collection of records (object
/// keyed by push id, or array). The record with the highest `timestamp` wins;
/// ties go to the one later in iteration order, which for push ids is the
/// later write. Records without a timestamp lose to any record with one.
pub fn select_latest(root: &Value) -> Option<&Value> {
    if is_record(root) {
        return Some(root);
    }
    let children: Box<dyn Iterator<Item = &Value>> = match root {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return None,
    };
    children
        .filter(|c| c.is_object())
        .fold(None, |best: Option<&Value>, c| match best {
            Some(b) if timestamp(c.get("timestamp")) < timestamp(b.get("timestamp")) => Some(b),
            _ => Some(c),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chamber_index_bounds() {
        assert!(ChamberIndex::new(0).is_none());
        assert!(ChamberIndex::new(4).is_none());
        assert_eq!(ChamberIndex::new(3).map(ChamberIndex::slot), Some(2));
    }

    #[test]
    fn sparse_water_levels_object_is_accepted() {
        let raw = json!({"data": {"water_levels": {"0": 1, "2": 1}}});
        let snap = normalize(&raw, &NormalizeCfg::default());
        assert_eq!(
            snap.water_levels,
            [WaterLevel::Full, WaterLevel::Empty, WaterLevel::Full]
        );
    }

    #[test]
    fn select_latest_prefers_highest_timestamp_then_later_entry() {
        let root = json!({
            "-a": {"timestamp": 5, "alert": "first"},
            "-b": {"timestamp": 9, "alert": "newest"},
            "-c": {"timestamp": 9, "alert": "tie-later"},
            "-d": {"alert": "no-ts"},
        });
        let latest = select_latest(&root).unwrap();
        assert_eq!(latest["alert"], "tie-later");
    }

    #[test]
    fn select_latest_handles_single_record_and_empty_nodes() {
        let rec = json!({"data": {}, "timestamp": 1});
        assert_eq!(select_latest(&rec), Some(&rec));
        assert!(select_latest(&json!({})).is_none());
        assert!(select_latest(&json!([])).is_none());
        assert!(select_latest(&json!("garbage")).is_none());
    }
}
