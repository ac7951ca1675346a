//! Bit-exact native records exchanged with the driver.
//!
//! ```text
//! frame:     id u32 LE | msg_type u8 | dlc u8 | data [u8; 8 or 64]
//! timestamp: millis u32 LE | millis_overflow u16 LE | micros u16 LE
//! ```
//!
//! Records are serialized field by field into caller-owned buffers. Nothing
//! here aliases the generic message.

use crate::error::{CanBusError, Result};
use crate::types::EXTENDED_ID_MASK;
use bitflags::bitflags;
use bytes::{Buf, BufMut};

pub const CLASSIC_DATA_LENGTH: usize = 8;
pub const FD_DATA_LENGTH: usize = 64;

const HEADER_SIZE: usize = 6;

pub const CLASSIC_FRAME_SIZE: usize = HEADER_SIZE + CLASSIC_DATA_LENGTH;
pub const FD_FRAME_SIZE: usize = HEADER_SIZE + FD_DATA_LENGTH;
pub const TIMESTAMP_SIZE: usize = 8;

pub const MAX_DLC: u8 = 15;

bitflags! {
    /// Native message-type bitmask. Bits combine freely on real frames.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageType: u8 {
        const STANDARD = 0x00;
        const RTR = 0x01;
        const EXTENDED = 0x02;
        const FD = 0x04;
        const BRS = 0x08;
        const ESI = 0x10;
        const ECHO = 0x20;
        const ERRFRAME = 0x40;
        const STATUS = 0x80;
    }
}

/// Which native record a channel exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Classic,
    Fd,
}

impl FrameFormat {
    /// Payload capacity of the fixed data buffer
    pub fn capacity(&self) -> usize {
        match self {
            FrameFormat::Classic => CLASSIC_DATA_LENGTH,
            FrameFormat::Fd => FD_DATA_LENGTH,
        }
    }

    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.capacity()
    }
}

/// Vendor frame record.
///
/// The data buffer always has FD capacity; only the first
/// [`FrameFormat::capacity`] bytes are serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeFrame {
    id: u32,
    msg_type: MessageType,
    dlc: u8,
    data: [u8; FD_DATA_LENGTH],
    format: FrameFormat,
}

impl NativeFrame {
    /// Builds a record, zero-extending `data` into the fixed buffer.
    pub fn new(
        format: FrameFormat,
        id: u32,
        msg_type: MessageType,
        dlc: u8,
        data: &[u8],
    ) -> Result<Self> {
        if dlc > MAX_DLC {
            return Err(CanBusError::InvalidFrame(format!("dlc {} out of range", dlc)));
        }
        if data.len() > format.capacity() {
            return Err(CanBusError::PayloadTooLarge {
                len: data.len(),
                max: format.capacity(),
            });
        }

        let mut buffer = [0u8; FD_DATA_LENGTH];
        buffer[..data.len()].copy_from_slice(data);

        Ok(Self {
            id: id & EXTENDED_ID_MASK,
            msg_type,
            dlc,
            data: buffer,
            format,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// The whole fixed buffer, including bytes past the decoded length.
    pub fn raw_data(&self) -> &[u8] {
        &self.data[..self.format.capacity()]
    }

    /// Serializes into `out`, which must be exactly the format's wire size.
    pub fn write_to(&self, out: &mut [u8]) -> Result<()> {
        if out.len() != self.format.wire_size() {
            return Err(CanBusError::InvalidFrame(format!(
                "output buffer is {} bytes, record needs {}",
                out.len(),
                self.format.wire_size()
            )));
        }

        let mut buf = out;
        buf.put_u32_le(self.id);
        buf.put_u8(self.msg_type.bits());
        buf.put_u8(self.dlc);
        buf.put_slice(self.raw_data());
        Ok(())
    }

    /// Parses a record of the given format from `input`.
    pub fn read_from(format: FrameFormat, input: &[u8]) -> Result<Self> {
        if input.len() != format.wire_size() {
            return Err(CanBusError::InvalidFrame(format!(
                "record is {} bytes, expected {}",
                input.len(),
                format.wire_size()
            )));
        }

        let mut buf = input;
        let id = buf.get_u32_le();
        let msg_type = MessageType::from_bits_retain(buf.get_u8());
        let dlc = buf.get_u8();

        Self::new(format, id, msg_type, dlc, buf.chunk())
    }
}

/// Timestamp of a classic frame.
///
/// Total microseconds = `micros + 1000 * millis + 1000 * 2^32 * millis_overflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeTimestamp {
    pub millis: u32,
    pub millis_overflow: u16,
    pub micros: u16,
}

impl NativeTimestamp {
    pub fn as_micros(&self) -> u64 {
        u64::from(self.micros)
            + 1000 * u64::from(self.millis)
            + 1000 * (1u64 << 32) * u64::from(self.millis_overflow)
    }

    /// Splits a microsecond count into the native triple. Counts beyond the
    /// overflow counter's range wrap.
    pub fn from_micros(total: u64) -> Self {
        let millis_total = total / 1000;
        Self {
            millis: millis_total as u32,
            millis_overflow: (millis_total >> 32) as u16,
            micros: (total % 1000) as u16,
        }
    }

    pub fn write_to(&self, out: &mut [u8; TIMESTAMP_SIZE]) {
        let mut buf = &mut out[..];
        buf.put_u32_le(self.millis);
        buf.put_u16_le(self.millis_overflow);
        buf.put_u16_le(self.micros);
    }

    pub fn read_from(input: &[u8; TIMESTAMP_SIZE]) -> Self {
        let mut buf = &input[..];
        Self {
            millis: buf.get_u32_le(),
            millis_overflow: buf.get_u16_le(),
            micros: buf.get_u16_le(),
        }
    }
}
