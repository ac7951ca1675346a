//! Native frame codec.
//!
//! Pure conversion between the generic [`Message`] and the vendor's
//! [`NativeFrame`] record: DLC tables, frame-kind classification and payload
//! truncation. No I/O happens here.

pub mod native;

#[cfg(test)]
mod tests;

use crate::driver::Status;
use crate::error::{CanBusError, Result};
use crate::types::{FrameKind, Message, Timestamp, EXTENDED_ID_MASK, STANDARD_ID_MASK};
use native::{FrameFormat, MessageType, NativeFrame, CLASSIC_DATA_LENGTH, MAX_DLC};

/// Payload length for every DLC code. Classic frames stop at 8.
pub const DLC_LENGTHS: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// Byte position of the channel status inside a status frame.
pub const STATUS_FRAME_STATE_POSITION: usize = 3;

/// Payload length encoded by `dlc`.
///
/// # Panics
///
/// Panics if `dlc` is greater than 15.
pub fn length_from_dlc(dlc: u8) -> usize {
    assert!(dlc <= MAX_DLC, "dlc {} out of range", dlc);
    DLC_LENGTHS[dlc as usize]
}

/// Smallest DLC whose length holds `len` bytes. Lengths past 64 saturate to 15;
/// [`encode`] rejects such payloads before they get here.
pub fn dlc_from_length(len: usize) -> u8 {
    if len <= 8 {
        return len as u8;
    }

    DLC_LENGTHS
        .iter()
        .position(|&length| length >= len)
        .map_or(MAX_DLC, |dlc| dlc as u8)
}

/// Semantic kind of a native message-type bitmask.
///
/// Bits are tested independently in priority order since real frames combine
/// them (FD + BRS + EXTENDED). A record with no qualifier bit is a standard
/// data frame; an echo bit alone does not change the kind.
pub fn classify(msg_type: MessageType) -> FrameKind {
    let qualifiers = msg_type.difference(MessageType::ECHO);

    if qualifiers.is_empty() || msg_type.intersects(MessageType::EXTENDED | MessageType::FD) {
        FrameKind::DataFrame
    } else if msg_type.contains(MessageType::RTR) {
        FrameKind::RemoteFrame
    } else if msg_type.intersects(MessageType::ERRFRAME | MessageType::STATUS) {
        FrameKind::ErrorFrame
    } else if msg_type.contains(MessageType::BRS) {
        FrameKind::FdBitRateSwitch
    } else if msg_type.contains(MessageType::ESI) {
        FrameKind::FdErrorStateIndicator
    } else {
        FrameKind::DataFrame
    }
}

/// Builds the native record for `msg` on a channel of the given format.
pub fn encode(msg: &Message, format: FrameFormat) -> Result<NativeFrame> {
    // a classic frame stays classic on an FD channel
    let max = if msg.is_fd {
        format.capacity()
    } else {
        CLASSIC_DATA_LENGTH
    };
    if msg.data.len() > max {
        return Err(CanBusError::PayloadTooLarge {
            len: msg.data.len(),
            max,
        });
    }

    let id_mask = if msg.is_extended {
        EXTENDED_ID_MASK
    } else {
        STANDARD_ID_MASK
    };
    if msg.id & !id_mask != 0 {
        return Err(CanBusError::InvalidId {
            id: msg.id,
            extended: msg.is_extended,
        });
    }

    let mut msg_type = if msg.is_extended {
        MessageType::EXTENDED
    } else {
        MessageType::STANDARD
    };
    if msg.kind == FrameKind::RemoteFrame {
        msg_type |= MessageType::RTR;
    }
    match format {
        FrameFormat::Fd if msg.is_fd => {
            msg_type |= MessageType::FD;
            if msg.kind == FrameKind::FdBitRateSwitch {
                msg_type |= MessageType::BRS;
            }
        }
        FrameFormat::Classic if msg.is_fd => {
            return Err(CanBusError::InvalidFrame(
                "FD message on a classic channel".into(),
            ));
        }
        _ => {}
    }

    NativeFrame::new(
        format,
        msg.id,
        msg_type,
        dlc_from_length(msg.data.len()),
        &msg.data,
    )
}

/// Builds the generic message for a received record.
///
/// Only the bytes covered by the DLC are copied; whatever the driver left in
/// the rest of the fixed buffer is dropped. A classic record claiming more
/// than 8 bytes delivers 8, and its reported DLC is clamped to match.
pub fn decode(frame: &NativeFrame, timestamp: Timestamp, channel: &str) -> Message {
    let msg_type = frame.msg_type();
    let len = length_from_dlc(frame.dlc()).min(frame.format().capacity());
    let dlc = dlc_from_length(len);

    Message {
        id: frame.id(),
        data: frame.raw_data()[..len].to_vec(),
        timestamp,
        kind: classify(msg_type),
        dlc,
        channel: channel.to_string(),
        is_extended: msg_type.contains(MessageType::EXTENDED),
        is_fd: msg_type.intersects(MessageType::FD | MessageType::BRS | MessageType::ESI),
    }
}

/// Channel status carried by a status frame, if the record is one.
pub fn status_frame_state(frame: &NativeFrame) -> Option<Status> {
    if !frame.msg_type().contains(MessageType::STATUS) {
        return None;
    }
    frame
        .raw_data()
        .get(STATUS_FRAME_STATE_POSITION)
        .map(|&state| Status::from_raw(u32::from(state)))
}

/// CAN controller error state derived from a native status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusStatus {
    Active,
    Warning,
    ErrorPassive,
    BusOff,
}

impl BusStatus {
    pub fn from_status(status: Status) -> Self {
        if status.contains(Status::BUSOFF) {
            BusStatus::BusOff
        } else if status.contains(Status::BUSPASSIVE) {
            BusStatus::ErrorPassive
        } else if status.intersects(Status::BUSLIGHT | Status::BUSHEAVY) {
            BusStatus::Warning
        } else {
            BusStatus::Active
        }
    }
}
