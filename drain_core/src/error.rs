use drain_traits::ActuatorField;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum DrainError {
    #[error("store transport error: {0}")]
    Transport(String),
    #[error("actuator write failed ({field} = {value}): {reason}")]
    ActuatorWrite {
        field: ActuatorField,
        value: bool,
        reason: String,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing store")]
    MissingStore,
    #[error("missing renderer")]
    MissingRenderer,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
