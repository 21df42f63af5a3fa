//! Reference stores for the drainage monitor.
//!
//! - `MemoryStore`: in-process fake of the realtime database, used by tests
//!   and by `drainmon --sim`.
//! - `FileStore`: a JSON export on disk, watched for changes.
//!
//! Both implement `drain_traits::SnapshotSource` and `drain_traits::ActuatorStore`.
pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
