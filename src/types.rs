use crate::driver::{CHANNEL_AVAILABLE, CHANNEL_OCCUPIED, CHANNEL_UNAVAILABLE};
use serde::{Deserialize, Serialize};

/// CAN ID type (11 or 29 significant bits)
pub type CanId = u32;

/// Generic frame data type
pub type FrameData = Vec<u8>;

/// Timestamp in microseconds since a driver-defined epoch
pub type Timestamp = u64;

pub const STANDARD_ID_MASK: CanId = 0x7FF;
pub const EXTENDED_ID_MASK: CanId = 0x1FFF_FFFF;

/// Semantic kind of a frame on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameKind {
    #[default]
    DataFrame,
    RemoteFrame,
    ErrorFrame,
    OverloadFrame,
    FdBitRateSwitch,
    FdErrorStateIndicator,
}

/// Wire-agnostic CAN / CAN-FD message.
///
/// `timestamp`, `dlc` and `channel` are only filled on receive. On send the
/// DLC is derived from the payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: CanId,
    pub data: FrameData,
    pub timestamp: Timestamp,
    pub kind: FrameKind,
    pub dlc: u8,
    pub channel: String,
    pub is_extended: bool,
    pub is_fd: bool,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: 0,
            data: Vec::new(),
            timestamp: 0,
            kind: FrameKind::DataFrame,
            dlc: 0,
            channel: String::new(),
            is_extended: false,
            is_fd: false,
        }
    }
}

impl Message {
    /// Data frame with an 11-bit identifier
    pub fn new_standard(id: CanId, data: &[u8]) -> Self {
        Self {
            id,
            data: data.to_vec(),
            ..Default::default()
        }
    }

    /// Data frame with a 29-bit identifier
    pub fn new_extended(id: CanId, data: &[u8]) -> Self {
        Self {
            id,
            data: data.to_vec(),
            is_extended: true,
            ..Default::default()
        }
    }

    /// Marks the message as a CAN-FD frame
    pub fn with_fd(mut self) -> Self {
        self.is_fd = true;
        self
    }

    pub fn with_kind(mut self, kind: FrameKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Whether the controller takes part in bus traffic or only listens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusMode {
    #[default]
    Active,
    Passive,
}

/// Availability of a hardware channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCondition {
    Available,
    Occupied,
    Unavailable,
    Invalid,
}

impl ChannelCondition {
    /// Reads the native condition word bit by bit. The occupied bit wins, so
    /// a channel held by the vendor viewer reports as occupied.
    pub fn from_native(value: u32) -> Self {
        if value & CHANNEL_OCCUPIED != 0 {
            ChannelCondition::Occupied
        } else if value & CHANNEL_AVAILABLE != 0 {
            ChannelCondition::Available
        } else if value == CHANNEL_UNAVAILABLE {
            ChannelCondition::Unavailable
        } else {
            ChannelCondition::Invalid
        }
    }

    /// Whether hardware is plugged in behind the channel
    pub fn is_attached(&self) -> bool {
        matches!(self, ChannelCondition::Available | ChannelCondition::Occupied)
    }
}

/// Identifier width a range filter applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Standard,
    Extended,
}

/// Configuration trait that must be implemented by all bus configurations
pub trait Config: Send + Sync {
    fn validate(&self) -> crate::error::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let msg = Message::new_extended(0x1234_5678, &[1, 2, 3]).with_fd();
        assert!(msg.is_extended);
        assert!(msg.is_fd);
        assert_eq!(msg.kind, FrameKind::DataFrame);
        assert_eq!(msg.data, vec![1, 2, 3]);

        let remote = Message::new_standard(0x7FF, &[]).with_kind(FrameKind::RemoteFrame);
        assert!(!remote.is_extended);
        assert_eq!(remote.kind, FrameKind::RemoteFrame);
    }

    #[test]
    fn test_channel_condition_from_native() {
        use crate::driver::CHANNEL_PCANVIEW;

        assert_eq!(
            ChannelCondition::from_native(CHANNEL_UNAVAILABLE),
            ChannelCondition::Unavailable,
        );
        assert_eq!(ChannelCondition::from_native(CHANNEL_AVAILABLE), ChannelCondition::Available);
        assert_eq!(ChannelCondition::from_native(CHANNEL_OCCUPIED), ChannelCondition::Occupied);
        assert_eq!(ChannelCondition::from_native(CHANNEL_PCANVIEW), ChannelCondition::Occupied);

        // undocumented bits next to a known one do not hide it
        assert_eq!(ChannelCondition::from_native(0x05), ChannelCondition::Available);
        assert_eq!(ChannelCondition::from_native(0x06), ChannelCondition::Occupied);
        assert_eq!(ChannelCondition::from_native(0x10), ChannelCondition::Invalid);

        for value in 0..0x20u32 {
            let attached = value & (CHANNEL_AVAILABLE | CHANNEL_OCCUPIED) != 0;
            assert_eq!(
                ChannelCondition::from_native(value).is_attached(),
                attached,
                "{:#x}",
                value,
            );
        }
    }
}
