//! Channel discovery.
//!
//! Only the USB family is probed. Each candidate's condition parameter is
//! read; a candidate that does not answer is simply not present.

use super::check_status;
use crate::driver::{Handle, Language, NativeDriver, Parameter, Status};
use crate::error::{CanBusError, Result};
use crate::types::ChannelCondition;
use tracing::debug;

/// Handles of all USB channels reporting available, occupied or
/// occupied-by-viewer.
pub fn attached_channels<D: NativeDriver + ?Sized>(driver: &D) -> Result<Vec<Handle>> {
    let mut attached = Vec::new();

    for candidate in Handle::USB_CHANNELS {
        let mut buffer = [0u8; 4];
        let status = driver.get_value(candidate, Parameter::CHANNEL_CONDITION, &mut buffer);

        if status.contains(Status::NODRIVER) {
            return Err(CanBusError::Driver {
                status,
                description: super::describe(driver, status, Language::Neutral),
            });
        }
        if !status.is_ok() {
            debug!(channel = %candidate, %status, "no answer from candidate");
            continue;
        }

        let condition = u32::from_le_bytes(buffer);
        if ChannelCondition::from_native(condition).is_attached() {
            debug!(channel = %candidate, condition, "channel attached");
            attached.push(candidate);
        }
    }

    Ok(attached)
}

/// Names (e.g. `PCAN_USBBUS1`) of the attached channels.
pub fn attached_channel_names<D: NativeDriver + ?Sized>(driver: &D) -> Result<Vec<String>> {
    Ok(attached_channels(driver)?
        .into_iter()
        .map(|handle| handle.to_string())
        .collect())
}

/// Number of channels the driver knows about, regardless of availability.
pub fn attached_channels_count<D: NativeDriver + ?Sized>(driver: &D) -> Result<u32> {
    let mut buffer = [0u8; 4];
    let status = driver.get_value(
        Handle::NONEBUS,
        Parameter::ATTACHED_CHANNELS_COUNT,
        &mut buffer,
    );
    check_status(
        driver,
        Language::Neutral,
        status,
        Some(Parameter::ATTACHED_CHANNELS_COUNT),
    )?;
    Ok(u32::from_le_bytes(buffer))
}

/// Uninitializes every channel initialized through this driver.
///
/// Buses still holding one of those channels see driver errors afterwards.
pub fn shutdown_all<D: NativeDriver + ?Sized>(driver: &D) -> Result<()> {
    let status = driver.uninitialize(Handle::NONEBUS);
    debug!(%status, "all channels uninitialized");
    check_status(driver, Language::Neutral, status, None).map(|_| ())
}
