use crate::driver::{Parameter, Status};
use crate::physical::LifecycleState;

/// Errors surfaced by the bus layer.
///
/// Driver-originated variants carry the native status and the description the
/// driver returned for it.
#[derive(Debug, thiserror::Error)]
pub enum CanBusError {
    /// Fatal native condition: illegal handle, bus-off, driver not loaded...
    #[error("driver error {status}: {description}")]
    Driver { status: Status, description: String },

    /// The hardware does not know this parameter.
    #[error("parameter {parameter} is not supported by this hardware ({description})")]
    UnsupportedParameter {
        parameter: Parameter,
        status: Status,
        description: String,
    },

    #[error("invalid value for parameter {parameter} ({description})")]
    InvalidParameterValue {
        parameter: Parameter,
        status: Status,
        description: String,
    },

    /// Transient; the caller may retry the send.
    #[error("transmit queue full {status}: {description}")]
    TransmitQueueFull { status: Status, description: String },

    /// Frames were lost because the queue was read too late.
    #[error("receive overrun {status}: {description}")]
    ReceiveOverrun { status: Status, description: String },

    #[error("cannot {operation} while channel is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("invalid channel selected: {0}")]
    InvalidChannel(String),

    #[error("invalid baud rate selected: {0}")]
    InvalidBaudRate(u32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("payload too large ({len} bytes, max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("identifier {id:#x} out of range (extended: {extended})")]
    InvalidId { id: u32, extended: bool },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Blocking on the receive event failed at the OS level.
    #[error("receive event wait failed: {0}")]
    Wait(#[from] std::io::Error),
}

impl CanBusError {
    /// Native status behind this error, when the driver produced it.
    pub fn status(&self) -> Option<Status> {
        match self {
            CanBusError::Driver { status, .. }
            | CanBusError::UnsupportedParameter { status, .. }
            | CanBusError::InvalidParameterValue { status, .. }
            | CanBusError::TransmitQueueFull { status, .. }
            | CanBusError::ReceiveOverrun { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for conditions that leave the channel usable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CanBusError::UnsupportedParameter { .. }
                | CanBusError::InvalidParameterValue { .. }
                | CanBusError::TransmitQueueFull { .. }
                | CanBusError::ReceiveOverrun { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CanBusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let full = CanBusError::TransmitQueueFull {
            status: Status::QXMTFULL,
            description: "Transmit queue is full".into(),
        };
        assert!(full.is_retryable());
        assert_eq!(full.status(), Some(Status::QXMTFULL));

        let fatal = CanBusError::Driver {
            status: Status::ILLHW,
            description: "Hardware handle is invalid".into(),
        };
        assert!(!fatal.is_retryable());
        assert_eq!(fatal.to_string(), "driver error 0x01400: Hardware handle is invalid");

        assert_eq!(CanBusError::InvalidBaudRate(42).status(), None);
    }

    #[test]
    fn test_invalid_id_message() {
        let err = CanBusError::InvalidId {
            id: 0x800,
            extended: false,
        };
        assert_eq!(err.to_string(), "identifier 0x800 out of range (extended: false)");
    }
}
