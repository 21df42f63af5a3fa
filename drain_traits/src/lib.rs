//! Collaborator seams between the reconciliation core and its environment.
//!
//! The core never talks to a concrete remote store. Snapshots come in through
//! `SnapshotSource`, actuator echoes and commands go through `ActuatorStore`.
//! Trait errors cross the boundary as `BoxError`, like a driver error would.
pub mod clock;
pub mod subscription;

pub use clock::{Clock, MonotonicClock};
pub use subscription::{Delivery, Subscription, TransportFault};

use serde::{Deserialize, Serialize};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Actuator control record as held by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoControl {
    pub servo_on: bool,
    pub auto_mode: bool,
}

impl ServoControl {
    pub fn with(mut self, field: ActuatorField, value: bool) -> Self {
        match field {
            ActuatorField::ServoOn => self.servo_on = value,
            ActuatorField::AutoMode => self.auto_mode = value,
        }
        self
    }
}

/// Writable fields of the actuator control record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorField {
    ServoOn,
    AutoMode,
}

impl ActuatorField {
    /// Key of this field in the store's `servo_control` node.
    pub fn key(self) -> &'static str {
        match self {
            ActuatorField::ServoOn => "servo_on",
            ActuatorField::AutoMode => "auto_mode",
        }
    }
}

impl std::fmt::Display for ActuatorField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Source of raw sensor snapshots.
///
/// Both methods yield the store's raw `sensor_data` node: either a single
/// record or a collection of records keyed by push id. Picking the newest
/// record is the consumer's job.
pub trait SnapshotSource {
    /// Push stream of the sensor node; the current value is delivered first.
    fn subscribe_snapshots(&mut self) -> Result<Subscription<serde_json::Value>, BoxError>;

    /// One-shot refresh. `Ok(None)` means the store holds no sensor data.
    fn fetch_latest(&mut self) -> Result<Option<serde_json::Value>, BoxError>;
}

/// Actuator control record: echoes in, commands out.
pub trait ActuatorStore {
    /// Push stream of the control record; the current value is delivered first.
    fn subscribe_actuator_state(&mut self) -> Result<Subscription<ServoControl>, BoxError>;

    /// Fire-and-forget write of one field. Failures are returned, never retried.
    fn write_actuator_command(&mut self, field: ActuatorField, value: bool)
    -> Result<(), BoxError>;
}

impl<T: SnapshotSource + ?Sized> SnapshotSource for Box<T> {
    fn subscribe_snapshots(&mut self) -> Result<Subscription<serde_json::Value>, BoxError> {
        (**self).subscribe_snapshots()
    }

    fn fetch_latest(&mut self) -> Result<Option<serde_json::Value>, BoxError> {
        (**self).fetch_latest()
    }
}

impl<T: ActuatorStore + ?Sized> ActuatorStore for Box<T> {
    fn subscribe_actuator_state(&mut self) -> Result<Subscription<ServoControl>, BoxError> {
        (**self).subscribe_actuator_state()
    }

    fn write_actuator_command(
        &mut self,
        field: ActuatorField,
        value: bool,
    ) -> Result<(), BoxError> {
        (**self).write_actuator_command(field, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn servo_control_with_sets_one_field() {
        let c = ServoControl::default().with(ActuatorField::AutoMode, true);
        assert_eq!(
            c,
            ServoControl {
                servo_on: false,
                auto_mode: true
            }
        );
        let c = c.with(ActuatorField::ServoOn, true);
        assert!(c.servo_on && c.auto_mode);
    }

    #[test]
    fn servo_control_tolerates_missing_keys() {
        let c: ServoControl = serde_json::from_str(r#"{"auto_mode": true}"#).unwrap();
        assert!(c.auto_mode);
        assert!(!c.servo_on);
    }
}
