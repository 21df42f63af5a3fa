//! In-memory stand-in for the remote store.
//!
//! Mirrors the realtime-database semantics the monitor relies on: every
//! subscriber gets the current value on subscribe, then one delivery per
//! change, and writes to `servo_control` are echoed to every actuator
//! subscriber (including the writer). Handles are cheap clones sharing state,
//! so a test can play the rig and the operator while the monitor holds its
//! own handle.
use crossbeam_channel as xch;
use drain_traits::{
    ActuatorField, ActuatorStore, BoxError, Delivery, ServoControl, SnapshotSource, Subscription,
    TransportFault,
};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;

#[derive(Default)]
struct Inner {
    sensor_data: Option<Value>,
    servo: ServoControl,
    snapshot_subs: Vec<xch::Sender<Delivery<Value>>>,
    servo_subs: Vec<xch::Sender<Delivery<ServoControl>>>,
    reject_writes: Option<String>,
    offline: Option<String>,
    writes: Vec<(ActuatorField, bool)>,
}

impl Inner {
    fn broadcast_sensor(&mut self) {
        if let Some(v) = &self.sensor_data {
            let v = v.clone();
            self.snapshot_subs.retain(|tx| tx.send(Ok(v.clone())).is_ok());
        }
    }

    fn broadcast_servo(&mut self) {
        let s = self.servo;
        self.servo_subs.retain(|tx| tx.send(Ok(s)).is_ok());
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole sensor node and notify subscribers.
    pub fn set_sensor_data(&self, node: Value) {
        let mut g = self.lock();
        g.sensor_data = Some(node);
        g.broadcast_sensor();
    }

    /// Remove all sensor data. Subscribers are not notified.
    pub fn clear_sensor_data(&self) {
        self.lock().sensor_data = None;
    }

    /// Append one record under `key`, the way the rig pushes a reading.
    pub fn push_record(&self, key: &str, record: Value) {
        let mut g = self.lock();
        let node = g
            .sensor_data
            .get_or_insert_with(|| Value::Object(Map::new()));
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            map.insert(key.to_string(), record);
        }
        g.broadcast_sensor();
    }

    pub fn servo_control(&self) -> ServoControl {
        self.lock().servo
    }

    /// Change the control record from "another device" (operator dashboard)
    /// without going through the actuator write path.
    pub fn set_servo_control(&self, ctrl: ServoControl) {
        let mut g = self.lock();
        g.servo = ctrl;
        g.broadcast_servo();
    }

    /// Make subsequent writes fail with `reason` (`None` restores writes).
    pub fn reject_writes(&self, reason: Option<&str>) {
        self.lock().reject_writes = reason.map(str::to_string);
    }

    /// Make fetches and new subscriptions fail with `reason` (`None` restores).
    pub fn set_offline(&self, reason: Option<&str>) {
        self.lock().offline = reason.map(str::to_string);
    }

    /// Deliver an in-band fault to every live snapshot subscriber.
    pub fn inject_fault(&self, msg: &str) {
        let mut g = self.lock();
        let fault = TransportFault(msg.to_string());
        g.snapshot_subs
            .retain(|tx| tx.send(Err(fault.clone())).is_ok());
    }

    /// Every accepted actuator write, in order.
    pub fn writes(&self) -> Vec<(ActuatorField, bool)> {
        self.lock().writes.clone()
    }

    /// Number of live (snapshot, actuator) subscribers. Dropped subscriptions
    /// are pruned on the next delivery.
    pub fn subscriber_counts(&self) -> (usize, usize) {
        let g = self.lock();
        (g.snapshot_subs.len(), g.servo_subs.len())
    }
}

impl SnapshotSource for MemoryStore {
    fn subscribe_snapshots(&mut self) -> Result<Subscription<Value>, BoxError> {
        let mut g = self.lock();
        if let Some(reason) = &g.offline {
            return Err(Box::new(StoreError::Unavailable(reason.clone())));
        }
        let (tx, sub) = Subscription::channel();
        if let Some(v) = &g.sensor_data {
            let _ = tx.send(Ok(v.clone()));
        }
        g.snapshot_subs.push(tx);
        Ok(sub)
    }

    fn fetch_latest(&mut self) -> Result<Option<Value>, BoxError> {
        let g = self.lock();
        if let Some(reason) = &g.offline {
            return Err(Box::new(StoreError::Unavailable(reason.clone())));
        }
        Ok(g.sensor_data.clone())
    }
}

impl ActuatorStore for MemoryStore {
    fn subscribe_actuator_state(&mut self) -> Result<Subscription<ServoControl>, BoxError> {
        let mut g = self.lock();
        if let Some(reason) = &g.offline {
            return Err(Box::new(StoreError::Unavailable(reason.clone())));
        }
        let (tx, sub) = Subscription::channel();
        let _ = tx.send(Ok(g.servo));
        g.servo_subs.push(tx);
        Ok(sub)
    }

    fn write_actuator_command(
        &mut self,
        field: ActuatorField,
        value: bool,
    ) -> Result<(), BoxError> {
        let mut g = self.lock();
        if let Some(reason) = &g.reject_writes {
            tracing::warn!(%field, value, reason = %reason, "memory store rejected write");
            return Err(Box::new(StoreError::WriteRejected(reason.clone())));
        }
        g.servo = g.servo.with(field, value);
        g.writes.push((field, value));
        tracing::debug!(%field, value, "memory store write");
        g.broadcast_servo();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn subscribe_delivers_current_value_first() {
        let mut store = MemoryStore::new();
        store.push_record("a", json!({"timestamp": 1}));
        let sub = store.subscribe_snapshots().unwrap();
        let first = sub.next_timeout(Duration::from_millis(50)).unwrap().unwrap();
        assert_eq!(first["a"]["timestamp"], 1);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = MemoryStore::new();
        let sub = store.subscribe_snapshots().unwrap();
        assert_eq!(store.subscriber_counts().0, 1);
        drop(sub);
        store.push_record("a", json!({}));
        assert_eq!(store.subscriber_counts().0, 0);
    }

    #[test]
    fn rejected_write_leaves_record_untouched() {
        let mut store = MemoryStore::new();
        store.reject_writes(Some("permission denied"));
        let err = store
            .write_actuator_command(ActuatorField::ServoOn, true)
            .unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert!(!store.servo_control().servo_on);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn offline_store_fails_fetch_and_subscribe() {
        let mut store = MemoryStore::new();
        store.set_offline(Some("no network"));
        assert!(store.fetch_latest().is_err());
        assert!(store.subscribe_snapshots().is_err());
        assert!(store.subscribe_actuator_state().is_err());
        store.set_offline(None);
        assert!(store.fetch_latest().unwrap().is_none());
    }
}
