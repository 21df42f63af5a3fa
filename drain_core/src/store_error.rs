//! Maps `Box<dyn Error>` from store trait boundaries to typed `DrainError`.
//!
//! The traits in `drain_traits` use `Box<dyn Error + Send + Sync>` so any
//! transport can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `drain_store::StoreError` downcasting.

use drain_traits::{ActuatorField, TransportFault};

use crate::error::DrainError;

/// Short operator-facing description of a store error.
pub fn describe_store_error(e: &(dyn std::error::Error + 'static)) -> String {
    #[cfg(feature = "store-errors")]
    {
        use drain_store::StoreError;
        if let Some(se) = e.downcast_ref::<StoreError>() {
            return match se {
                StoreError::Unavailable(why) => format!("store unavailable ({why})"),
                StoreError::WriteRejected(why) => format!("write rejected ({why})"),
                other => other.to_string(),
            };
        }
    }

    if let Some(fault) = e.downcast_ref::<TransportFault>() {
        return fault.0.clone();
    }
    e.to_string()
}

/// Map a fetch/subscribe failure to a typed `DrainError`.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> DrainError {
    DrainError::Transport(describe_store_error(e))
}

/// Map a failed actuator write to a typed `DrainError`.
pub fn write_failure(
    field: ActuatorField,
    value: bool,
    e: &(dyn std::error::Error + 'static),
) -> DrainError {
    DrainError::ActuatorWrite {
        field,
        value,
        reason: describe_store_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_keep_their_message() {
        let e: Box<dyn std::error::Error + Send + Sync> = "socket closed".into();
        match map_store_error(&*e) {
            DrainError::Transport(msg) => assert_eq!(msg, "socket closed"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn transport_fault_is_unwrapped() {
        let e = TransportFault("listener cancelled".into());
        assert_eq!(describe_store_error(&e), "listener cancelled");
    }

    #[cfg(feature = "store-errors")]
    #[test]
    fn store_errors_are_downcast() {
        let e = drain_store::StoreError::WriteRejected("permission denied".into());
        let err = write_failure(ActuatorField::ServoOn, true, &e);
        assert_eq!(
            err.to_string(),
            "actuator write failed (servo_on = true): write rejected (permission denied)"
        );
    }
}
