//! Bus implementations on top of the native driver binding.
//!
//! This module provides:
//! - the uniform [`Bus`] interface every bus implementation offers
//! - [`pcan::PcanBus`], a channel driven through a [`NativeDriver`]
//! - channel discovery helpers in [`enumerate`]
//! - a virtual loopback driver in [`mock`] (feature `mock`)
//!
//! A bus is not internally synchronized. Each instance must be driven by one
//! caller at a time; `&mut self` on the I/O methods enforces this.
//!
//! # Examples
//!
//! ```rust,no_run
//! use libcanbus::physical::{mock::MockDriver, pcan::PcanBus, BusConfig};
//! use libcanbus::driver::Handle;
//! use libcanbus::types::Message;
//! use std::sync::Arc;
//!
//! let driver = Arc::new(MockDriver::with_channels(&[Handle::USBBUS1]));
//! let config = BusConfig {
//!     recv_echo_frames: true,
//!     ..BusConfig::default()
//! };
//! let mut bus = PcanBus::open(driver, config).unwrap();
//! bus.send(&Message::new_standard(0x123, &[0x55; 8])).unwrap();
//! let echo = bus.recv(100).unwrap();
//! assert!(echo.is_some());
//! ```

pub mod config;
pub mod enumerate;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pcan;
mod recv;


pub use config::BusConfig;

use crate::driver::{Language, NativeDriver, Parameter, Status, StatusClass, MAX_STRING_BUFFER};
use crate::error::{CanBusError, Result};
use crate::types::{BusMode, ChannelCondition, FilterMode, Message};

/// Lifecycle of a bus instance. `ShutDown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    ShutDown,
}

/// Uniform bus interface
pub trait Bus: Send {
    /// Sends a single message. No retry happens internally.
    fn send(&mut self, msg: &Message) -> Result<()>;

    /// Receives a single message, waiting at most `timeout_ms` milliseconds.
    /// A negative timeout waits without limit. `Ok(None)` means nothing
    /// arrived in time.
    fn recv(&mut self, timeout_ms: i32) -> Result<Option<Message>>;

    fn status_is_okay(&self) -> Result<bool>;

    /// Device-specific status code
    fn status(&self) -> Result<u32>;

    fn bus_mode(&self) -> BusMode;

    /// Drains queued messages without waiting. A `limit` of 0 drains all.
    fn read_buffer(&mut self, limit: u16) -> Result<Vec<Message>>;

    /// Accepts the inclusive id range `from_id..=to_id`.
    fn set_filter(&mut self, from_id: u32, to_id: u32, mode: FilterMode) -> Result<()>;

    /// Re-opens reception for all ids.
    fn reset_filter(&mut self) -> Result<()>;

    /// Clears receive and transmit queues; does not reset hardware.
    fn reset(&mut self) -> Result<()>;

    fn shutdown(&mut self) -> Result<()>;

    fn channel_condition(&self) -> Result<ChannelCondition>;
}

/// Driver-supplied description of `status`, NUL-terminated text decoded
/// lossily. Falls back to the hex code when the lookup fails.
pub(crate) fn describe<D: NativeDriver + ?Sized>(
    driver: &D,
    status: Status,
    language: Language,
) -> String {
    let mut buffer = [0u8; MAX_STRING_BUFFER];
    let ret = driver.get_error_text(status, language, &mut buffer);
    if !ret.is_ok() {
        return format!("could not retrieve error text for status {}", status);
    }
    c_string(&buffer)
}

/// Text up to the first NUL byte.
pub(crate) fn c_string(buffer: &[u8]) -> String {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}

/// Maps a native status to the crate error taxonomy.
///
/// Returns `Ok` with the status for success, advisory bits and an empty
/// receive queue; callers decide what an empty queue means.
pub(crate) fn check_status<D: NativeDriver + ?Sized>(
    driver: &D,
    language: Language,
    status: Status,
    parameter: Option<Parameter>,
) -> Result<Status> {
    match status.class() {
        StatusClass::Ok | StatusClass::Advisory | StatusClass::Empty => Ok(status),
        StatusClass::Recoverable => {
            let description = describe(driver, status, language);
            Err(match parameter {
                Some(parameter) if status.contains(Status::ILLPARAMTYPE) => {
                    CanBusError::UnsupportedParameter {
                        parameter,
                        status,
                        description,
                    }
                }
                Some(parameter) if status.contains(Status::ILLPARAMVAL) => {
                    CanBusError::InvalidParameterValue {
                        parameter,
                        status,
                        description,
                    }
                }
                _ if status.intersects(Status::QXMTFULL | Status::XMTFULL) => {
                    CanBusError::TransmitQueueFull {
                        status,
                        description,
                    }
                }
                _ if status.intersects(Status::QOVERRUN | Status::OVERRUN) => {
                    CanBusError::ReceiveOverrun {
                        status,
                        description,
                    }
                }
                // parameter errors outside a parameter call
                _ => CanBusError::Driver {
                    status,
                    description,
                },
            })
        }
        StatusClass::Fatal => Err(CanBusError::Driver {
            status,
            description: describe(driver, status, language),
        }),
    }
}
