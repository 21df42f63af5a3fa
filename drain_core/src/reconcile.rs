//! Reconciliation engine: normalized snapshot + actuator state -> view model
//! and actuator command.
//!
//! Everything here is a pure function of its inputs. The engine owns no state
//! and cannot fail; bad input was already degraded to defaults by
//! `snapshot::normalize`.
use serde::Serialize;

use crate::actuator::ActuatorState;
use crate::config::EngineCfg;
use crate::gps::GeoPoint;
use crate::snapshot::{ALERT_NONE, ChamberIndex, NormalizedSnapshot, WaterLevel};

/// Blockage kind shown when the rig did not report one.
pub const UNKNOWN_BLOCKAGE: &str = "Unknown";
pub const NO_ALERTS: &str = "No alerts";
pub const PROXIMITY_SUFFIX: &str = "Proximity Alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChamberStatus {
    Ok,
    Blocked,
}

impl std::fmt::Display for ChamberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            ChamberStatus::Ok => "OK",
            ChamberStatus::Blocked => "BLOCKED",
        })
    }
}

/// Outcome of the blockage heuristic.
///
/// When `is_blockage` is false every other field is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Diagnosis {
    pub is_blockage: bool,
    /// Chamber shown to the operator: reported by the rig, else inferred.
    ///
    /// A rig-reported chamber is taken as is, so this may name a chamber that
    /// the water levels show as full. Use `inferred_chamber` for the empty one.
    pub blocked_chamber: Option<ChamberIndex>,
    /// The empty chamber of the single-empty pattern. Always consistent with
    /// the water levels, whatever the rig reported.
    pub inferred_chamber: Option<ChamberIndex>,
    pub blockage_type: Option<String>,
}

impl Diagnosis {
    pub fn clear() -> Self {
        Self::default()
    }

    /// Blockage type for display; `"Unknown"` when the rig sent none.
    pub fn kind(&self) -> &str {
        self.blockage_type.as_deref().unwrap_or(UNKNOWN_BLOCKAGE)
    }
}

/// Index of the single empty chamber when exactly one of three is empty.
///
/// (1,1,0) -> 3, (1,0,1) -> 2, (0,1,1) -> 1; every other pattern -> `None`.
pub fn infer_blocked_chamber(levels: &[WaterLevel; 3]) -> Option<ChamberIndex> {
    let mut empty = levels
        .iter()
        .zip(ChamberIndex::ALL)
        .filter(|(level, _)| !level.is_full())
        .map(|(_, idx)| idx);
    match (empty.next(), empty.next()) {
        (Some(idx), None) => Some(idx),
        _ => None,
    }
}

pub fn diagnose(snap: &NormalizedSnapshot) -> Diagnosis {
    let Some(inferred) = infer_blocked_chamber(&snap.water_levels) else {
        return Diagnosis::clear();
    };
    Diagnosis {
        is_blockage: true,
        blocked_chamber: Some(snap.blocked_chamber.unwrap_or(inferred)),
        inferred_chamber: Some(inferred),
        blockage_type: Some(
            snap.blockage_type
                .clone()
                .unwrap_or_else(|| UNKNOWN_BLOCKAGE.to_string()),
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Elevated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub text: String,
    pub severity: Severity,
}

/// Strictly below the threshold on either sonar.
pub fn proximity_active(snap: &NormalizedSnapshot, cfg: &EngineCfg) -> bool {
    snap.distance1_cm < cfg.proximity_cm || snap.distance2_cm < cfg.proximity_cm
}

/// Merge the alert sources into the single headline.
///
/// Blockage beats the rig's alert field, which beats "No alerts". Proximity
/// never replaces; it is appended unless the headline already mentions it.
pub fn headline(snap: &NormalizedSnapshot, diagnosis: &Diagnosis, proximity: bool) -> AlertMessage {
    let (mut text, mut severity) = if diagnosis.is_blockage {
        (
            format!("Blockage Detected: {}", diagnosis.kind()),
            Severity::Elevated,
        )
    } else if snap.alert != ALERT_NONE {
        (snap.alert.clone(), Severity::Elevated)
    } else {
        (NO_ALERTS.to_string(), Severity::Normal)
    };

    if proximity {
        if !text.contains("Proximity") {
            text.push_str("; ");
            text.push_str(PROXIMITY_SUFFIX);
        }
        severity = Severity::Elevated;
    }
    AlertMessage { text, severity }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActuatorCommand {
    NoChange,
    TurnOn,
}

/// The engine only ever asks to turn the actuator on; turning it off is the
/// timer's job.
pub fn actuator_command(diagnosis: &Diagnosis, actuator: &ActuatorState) -> ActuatorCommand {
    if actuator.auto_mode
        && diagnosis.is_blockage
        && actuator.running_since.is_none()
        && !actuator.episode_latched
    {
        ActuatorCommand::TurnOn
    } else {
        ActuatorCommand::NoChange
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChamberView {
    pub index: ChamberIndex,
    pub status: ChamberStatus,
    pub water_full: bool,
    /// Gauge value, 100 or 0.
    pub fill_percent: u8,
}

/// Pre-formatted sensor lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReadout {
    pub sonar1: String,
    pub sonar2: String,
    pub gas: String,
    pub temperature: String,
    pub ir: String,
    pub flame: String,
}

fn detected(flag: bool) -> &'static str {
    if flag { "Detected" } else { "Not Detected" }
}

fn sonar_line(n: u8, cm: f64, sentinel: f64) -> String {
    if cm >= sentinel {
        format!("Sonar {n}: -- cm")
    } else {
        format!("Sonar {n}: {cm:.1} cm")
    }
}

impl SensorReadout {
    pub fn from_snapshot(snap: &NormalizedSnapshot, cfg: &EngineCfg) -> Self {
        Self {
            sonar1: sonar_line(1, snap.distance1_cm, cfg.distance_sentinel_cm),
            sonar2: sonar_line(2, snap.distance2_cm, cfg.distance_sentinel_cm),
            gas: format!("MQ8 Gas: {:.2} V", snap.gas_volts),
            temperature: format!("Temperature: {:.1} °C", snap.temperature_c),
            ir: format!("IR: {}", detected(snap.ir_detected)),
            flame: format!("Flame: {}", detected(snap.flame_detected)),
        }
    }

    pub fn lines(&self) -> [&str; 6] {
        [
            &self.sonar1,
            &self.sonar2,
            &self.gas,
            &self.temperature,
            &self.ir,
            &self.flame,
        ]
    }
}

/// Everything a presentation layer needs for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub chambers: [ChamberView; 3],
    pub alert: AlertMessage,
    pub proximity: bool,
    pub proximity_text: String,
    pub readout: SensorReadout,
    pub gps: String,
    pub gps_point: GeoPoint,
    pub gps_locked: bool,
    pub timestamp_s: u64,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub view: ViewModel,
    pub diagnosis: Diagnosis,
    pub command: ActuatorCommand,
}

fn proximity_banner(active: bool, cfg: &EngineCfg) -> String {
    if active {
        format!("Proximity Alert: Object < {} cm", cfg.proximity_cm)
    } else {
        "Proximity: Safe".to_string()
    }
}

pub fn reconcile(
    snap: &NormalizedSnapshot,
    actuator: &ActuatorState,
    cfg: &EngineCfg,
) -> Reconciliation {
    let diagnosis = diagnose(snap);
    let proximity = proximity_active(snap, cfg);
    let alert = headline(snap, &diagnosis, proximity);

    let chambers = ChamberIndex::ALL.map(|index| {
        let water_full = snap.water_levels[index.slot()].is_full();
        ChamberView {
            index,
            status: if diagnosis.blocked_chamber == Some(index) {
                ChamberStatus::Blocked
            } else {
                ChamberStatus::Ok
            },
            water_full,
            fill_percent: if water_full { 100 } else { 0 },
        }
    });

    let command = actuator_command(&diagnosis, actuator);
    if diagnosis.is_blockage {
        tracing::debug!(
            chamber = diagnosis.blocked_chamber.map(ChamberIndex::get),
            kind = diagnosis.kind(),
            ?command,
            "blockage diagnosed"
        );
    }

    Reconciliation {
        view: ViewModel {
            chambers,
            alert,
            proximity,
            proximity_text: proximity_banner(proximity, cfg),
            readout: SensorReadout::from_snapshot(snap, cfg),
            gps: snap.gps.display(),
            gps_point: snap.gps.point,
            gps_locked: snap.gps.locked,
            timestamp_s: snap.timestamp_s,
        },
        diagnosis,
        command,
    }
}
