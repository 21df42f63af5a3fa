//! Store backed by a JSON export on disk.
//!
//! Document layout, matching the realtime-database export of the rig:
//!
//! ```json
//! { "sensor_data": { "<push id>": { "data": {...}, "gps": "...", "alert": "...", "timestamp": 0 } },
//!   "servo_control": { "servo_on": false, "auto_mode": true } }
//! ```
//!
//! Subscriptions are served by watcher threads that re-read the file every
//! `watch` interval and deliver only when the watched node changed. A watcher
//! exits when its subscription is dropped or when the store is dropped.
//!
//! Writes made through this handle are also echoed straight to its actuator
//! subscriptions. A watcher alone would miss a value that flips back within
//! one watch interval.
use crossbeam_channel as xch;
use drain_traits::{
    ActuatorField, ActuatorStore, BoxError, Delivery, ServoControl, SnapshotSource, Subscription,
    TransportFault,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Result, StoreError};

const SENSOR_KEY: &str = "sensor_data";
const SERVO_KEY: &str = "servo_control";

pub struct FileStore {
    path: PathBuf,
    watch: Duration,
    watchers: Vec<Watcher>,
    local_echo: Vec<xch::Sender<Delivery<ServoControl>>>,
}

impl FileStore {
    /// No I/O happens until the first read or write.
    pub fn open(path: impl Into<PathBuf>, watch: Duration) -> Self {
        Self {
            path: path.into(),
            watch: watch.max(Duration::from_millis(1)),
            watchers: Vec::new(),
            local_echo: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_document(&self) -> Result<Value> {
        read_document(&self.path)
    }

    pub fn servo_control(&self) -> Result<ServoControl> {
        servo_node(&self.read_document()?)
    }

    /// Append one sensor record under `key`, creating the document if needed.
    pub fn append_record(&self, key: &str, record: Value) -> Result<()> {
        let mut doc = read_or_empty(&self.path)?;
        let root = as_object(&mut doc)?;
        let node = root
            .entry(SENSOR_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if !node.is_object() {
            return Err(StoreError::Malformed(format!("{SENSOR_KEY} is not an object")));
        }
        if let Value::Object(map) = node {
            map.insert(key.to_string(), record);
        }
        write_document(&self.path, &doc)
    }

    fn set_field(&self, field: ActuatorField, value: bool) -> Result<ServoControl> {
        let mut doc = read_or_empty(&self.path)?;
        let current = servo_node(&doc)?;
        let updated = current.with(field, value);
        let root = as_object(&mut doc)?;
        root.insert(SERVO_KEY.to_string(), serde_json::to_value(updated)?);
        write_document(&self.path, &doc)?;
        Ok(updated)
    }

    fn spawn_watch<T>(
        &mut self,
        tx: xch::Sender<Delivery<T>>,
        extract: fn(&Value) -> Result<Option<T>>,
    ) where
        T: PartialEq + Clone + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_bg = shutdown.clone();
        let path = self.path.clone();
        let watch = self.watch;

        let handle = std::thread::spawn(move || {
            watch_loop(&path, watch, &tx, &shutdown_bg, extract);
            tracing::trace!(path = %path.display(), "file store watcher exiting");
        });

        self.watchers.retain(|w| !w.finished());
        self.watchers.push(Watcher {
            shutdown,
            handle: Some(handle),
        });
    }
}

fn watch_loop<T: PartialEq + Clone>(
    path: &Path,
    watch: Duration,
    tx: &xch::Sender<Delivery<T>>,
    shutdown: &AtomicBool,
    extract: fn(&Value) -> Result<Option<T>>,
) {
    let mut last: Option<T> = None;
    let mut last_fault: Option<String> = None;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let outcome = read_document(path).and_then(|doc| extract(&doc));
        let sent = match outcome {
            Ok(Some(v)) if last.as_ref() != Some(&v) => {
                last = Some(v.clone());
                last_fault = None;
                tx.send(Ok(v)).is_ok()
            }
            Ok(_) => true,
            Err(e) => {
                let msg = e.to_string();
                if last_fault.as_deref() == Some(msg.as_str()) {
                    true
                } else {
                    tracing::warn!(path = %path.display(), error = %msg, "file store read failed");
                    last_fault = Some(msg.clone());
                    tx.send(Err(TransportFault(msg))).is_ok()
                }
            }
        };
        // Consumer gone: the subscription was dropped.
        if !sent {
            break;
        }
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(watch);
    }
}

struct Watcher {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl Watcher {
    fn finished(&self) -> bool {
        self.handle.as_ref().is_none_or(std::thread::JoinHandle::is_finished)
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "file store watcher panicked during shutdown");
        }
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::Unavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    let doc: Value = serde_json::from_str(&text)?;
    if !doc.is_object() {
        return Err(StoreError::Malformed("document root is not an object".into()));
    }
    Ok(doc)
}

fn read_or_empty(path: &Path) -> Result<Value> {
    match read_document(path) {
        Err(StoreError::Unavailable(_)) if !path.exists() => Ok(Value::Object(Map::new())),
        other => other,
    }
}

/// Write through a sibling temp file and rename, so watchers never see a torn document.
fn write_document(path: &Path, doc: &Value) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn as_object(doc: &mut Value) -> Result<&mut Map<String, Value>> {
    doc.as_object_mut()
        .ok_or_else(|| StoreError::Malformed("document root is not an object".into()))
}

fn sensor_node(doc: &Value) -> Result<Option<Value>> {
    Ok(doc.get(SENSOR_KEY).filter(|v| !v.is_null()).cloned())
}

fn servo_node(doc: &Value) -> Result<ServoControl> {
    match doc.get(SERVO_KEY) {
        None | Some(Value::Null) => Ok(ServoControl::default()),
        Some(v) => serde_json::from_value(v.clone())
            .map_err(|e| StoreError::Malformed(format!("{SERVO_KEY}: {e}"))),
    }
}

impl SnapshotSource for FileStore {
    fn subscribe_snapshots(&mut self) -> std::result::Result<Subscription<Value>, BoxError> {
        let (tx, sub) = Subscription::channel();
        self.spawn_watch(tx, sensor_node);
        Ok(sub)
    }

    fn fetch_latest(&mut self) -> std::result::Result<Option<Value>, BoxError> {
        let doc = self.read_document()?;
        Ok(sensor_node(&doc)?)
    }
}

impl ActuatorStore for FileStore {
    fn subscribe_actuator_state(
        &mut self,
    ) -> std::result::Result<Subscription<ServoControl>, BoxError> {
        let (tx, sub) = Subscription::channel();
        self.local_echo.push(tx.clone());
        self.spawn_watch(tx, |doc| servo_node(doc).map(Some));
        Ok(sub)
    }

    fn write_actuator_command(
        &mut self,
        field: ActuatorField,
        value: bool,
    ) -> std::result::Result<(), BoxError> {
        let updated = self.set_field(field, value)?;
        tracing::debug!(%field, value, path = %self.path.display(), "file store write");
        // A failed send means the subscription was dropped.
        self.local_echo.retain(|tx| tx.send(Ok(updated)).is_ok());
        Ok(())
    }
}
