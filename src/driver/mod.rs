//! Native driver binding.
//!
//! The vendor library is reached through the [`NativeDriver`] capability. Its
//! methods mirror the C entry points one to one: they take plain values and
//! fixed-size byte buffers and answer with a [`Status`] bitmask. Loading the
//! shared library and resolving its symbols happens once per process outside
//! this crate; whatever does it hands an implementation of this trait to the
//! bus. Tests use [`crate::physical::mock::MockDriver`].
//!
//! Frame and timestamp buffers use the layouts in [`crate::data_link::native`].

mod handle;
mod status;

pub use handle::Handle;
pub use status::{Status, StatusClass};

use crate::data_link::native::{CLASSIC_FRAME_SIZE, FD_FRAME_SIZE, TIMESTAMP_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;

/// Size of any string buffer exchanged with the driver.
pub const MAX_STRING_BUFFER: usize = 256;

/// Maximum length of a device name: 32 characters plus terminator.
pub const MAX_HARDWARE_NAME: usize = 33;

/// Vendor parameter key for get/set value calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parameter(pub u8);

impl Parameter {
    pub const DEVICE_ID: Parameter = Parameter(1);
    pub const FIVE_VOLTS_POWER: Parameter = Parameter(2);
    pub const RECEIVE_EVENT: Parameter = Parameter(3);
    pub const MESSAGE_FILTER: Parameter = Parameter(4);
    pub const API_VERSION: Parameter = Parameter(5);
    pub const CHANNEL_VERSION: Parameter = Parameter(6);
    pub const BUSOFF_AUTORESET: Parameter = Parameter(7);
    pub const LISTEN_ONLY: Parameter = Parameter(8);
    pub const LOG_LOCATION: Parameter = Parameter(9);
    pub const LOG_STATUS: Parameter = Parameter(10);
    pub const LOG_CONFIGURE: Parameter = Parameter(11);
    pub const LOG_TEXT: Parameter = Parameter(12);
    pub const CHANNEL_CONDITION: Parameter = Parameter(13);
    pub const HARDWARE_NAME: Parameter = Parameter(14);
    pub const RECEIVE_STATUS: Parameter = Parameter(15);
    pub const CONTROLLER_NUMBER: Parameter = Parameter(16);
    pub const CHANNEL_IDENTIFYING: Parameter = Parameter(21);
    pub const CHANNEL_FEATURES: Parameter = Parameter(22);
    pub const BITRATE_ADAPTING: Parameter = Parameter(23);
    pub const BITRATE_INFO: Parameter = Parameter(24);
    pub const BITRATE_INFO_FD: Parameter = Parameter(25);
    pub const BUSSPEED_NOMINAL: Parameter = Parameter(26);
    pub const BUSSPEED_DATA: Parameter = Parameter(27);
    pub const IP_ADDRESS: Parameter = Parameter(28);
    pub const LAN_SERVICE_STATUS: Parameter = Parameter(29);
    pub const ALLOW_STATUS_FRAMES: Parameter = Parameter(30);
    pub const ALLOW_RTR_FRAMES: Parameter = Parameter(31);
    pub const ALLOW_ERROR_FRAMES: Parameter = Parameter(32);
    pub const INTERFRAME_DELAY: Parameter = Parameter(33);
    pub const ACCEPTANCE_FILTER_11BIT: Parameter = Parameter(34);
    pub const ACCEPTANCE_FILTER_29BIT: Parameter = Parameter(35);
    pub const IO_DIGITAL_CONFIGURATION: Parameter = Parameter(36);
    pub const IO_DIGITAL_VALUE: Parameter = Parameter(37);
    pub const IO_DIGITAL_SET: Parameter = Parameter(38);
    pub const IO_DIGITAL_CLEAR: Parameter = Parameter(39);
    pub const IO_ANALOG_VALUE: Parameter = Parameter(40);
    pub const FIRMWARE_VERSION: Parameter = Parameter(41);
    pub const ATTACHED_CHANNELS_COUNT: Parameter = Parameter(42);
    pub const ATTACHED_CHANNELS: Parameter = Parameter(43);
    pub const ALLOW_ECHO_FRAMES: Parameter = Parameter(44);
    pub const DEVICE_PART_NUMBER: Parameter = Parameter(45);
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

// Parameter values
pub const PARAMETER_OFF: u32 = 0x00;
pub const PARAMETER_ON: u32 = 0x01;

pub const FILTER_CLOSE: u32 = 0x00;
pub const FILTER_OPEN: u32 = 0x01;
pub const FILTER_CUSTOM: u32 = 0x02;

pub const CHANNEL_UNAVAILABLE: u32 = 0x00;
pub const CHANNEL_AVAILABLE: u32 = 0x01;
pub const CHANNEL_OCCUPIED: u32 = 0x02;
pub const CHANNEL_PCANVIEW: u32 = CHANNEL_AVAILABLE | CHANNEL_OCCUPIED;

pub const FEATURE_FD_CAPABLE: u32 = 0x01;

/// BTR0/BTR1 register value for a classic CAN bit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Baudrate(pub u16);

impl Baudrate {
    pub const BAUD_1M: Baudrate = Baudrate(0x0014);
    pub const BAUD_800K: Baudrate = Baudrate(0x0016);
    pub const BAUD_500K: Baudrate = Baudrate(0x001C);
    pub const BAUD_250K: Baudrate = Baudrate(0x011C);
    pub const BAUD_125K: Baudrate = Baudrate(0x031C);
    pub const BAUD_100K: Baudrate = Baudrate(0x432F);
    pub const BAUD_95K: Baudrate = Baudrate(0xC34E);
    pub const BAUD_83K: Baudrate = Baudrate(0x852B);
    pub const BAUD_50K: Baudrate = Baudrate(0x472F);
    pub const BAUD_47K: Baudrate = Baudrate(0x1414);
    pub const BAUD_33K: Baudrate = Baudrate(0x8B2F);
    pub const BAUD_20K: Baudrate = Baudrate(0x532F);
    pub const BAUD_10K: Baudrate = Baudrate(0x672F);
    pub const BAUD_5K: Baudrate = Baudrate(0x7F7F);

    /// Maps a bit rate in bits/s to its register value. Only the standard
    /// rates have one.
    pub fn from_bits_per_second(bps: u32) -> Option<Baudrate> {
        BAUDRATES
            .iter()
            .find(|(rate, _)| *rate == bps)
            .map(|(_, baud)| *baud)
    }

    pub fn bits_per_second(&self) -> Option<u32> {
        BAUDRATES
            .iter()
            .find(|(_, baud)| baud == self)
            .map(|(rate, _)| *rate)
    }
}

const BAUDRATES: [(u32, Baudrate); 14] = [
    (1_000_000, Baudrate::BAUD_1M),
    (800_000, Baudrate::BAUD_800K),
    (500_000, Baudrate::BAUD_500K),
    (250_000, Baudrate::BAUD_250K),
    (125_000, Baudrate::BAUD_125K),
    (100_000, Baudrate::BAUD_100K),
    (95_000, Baudrate::BAUD_95K),
    (83_000, Baudrate::BAUD_83K),
    (50_000, Baudrate::BAUD_50K),
    (47_000, Baudrate::BAUD_47K),
    (33_000, Baudrate::BAUD_33K),
    (20_000, Baudrate::BAUD_20K),
    (10_000, Baudrate::BAUD_10K),
    (5_000, Baudrate::BAUD_5K),
];

/// Language of driver-supplied error texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Neutral,
    German,
    English,
    Italian,
    Spanish,
    French,
}

impl Language {
    pub fn code(&self) -> u16 {
        match self {
            Language::Neutral => 0x00,
            Language::German => 0x07,
            Language::English => 0x09,
            Language::Italian => 0x10,
            Language::Spanish => 0x0A,
            Language::French => 0x0C,
        }
    }
}

/// Result of blocking on a receive event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
}

/// OS-level wait primitive signalled by the driver when frames arrive.
///
/// The object is owned by exactly one channel. Dropping it releases the
/// underlying OS resource and unregisters it from the driver.
pub trait WaitEvent: Send {
    /// Blocks until the event is signalled or `timeout` elapses. `None` waits
    /// without a limit.
    fn wait(&self, timeout: Option<Duration>) -> io::Result<WaitOutcome>;
}

/// Entry points of the vendor driver.
///
/// Every method is a thin call into the native library. Implementations must
/// not interpret the status they return; classification happens in the bus.
pub trait NativeDriver: Send + Sync {
    /// Initializes a classic channel. Non plug-and-play hardware parameters
    /// are fixed to the vendor defaults by the binding.
    fn initialize(&self, channel: Handle, baudrate: Baudrate) -> Status;

    /// Initializes an FD channel with an opaque bit-rate string.
    fn initialize_fd(&self, channel: Handle, bitrate: &str) -> Status;

    fn uninitialize(&self, channel: Handle) -> Status;

    /// Clears the receive and transmit queues of a channel.
    fn reset(&self, channel: Handle) -> Status;

    fn get_status(&self, channel: Handle) -> Status;

    /// Non-blocking read of one classic frame into `frame` and its timestamp
    /// into `timestamp`. Reports `QRCVEMPTY` when nothing is queued.
    fn read(
        &self,
        channel: Handle,
        frame: &mut [u8; CLASSIC_FRAME_SIZE],
        timestamp: &mut [u8; TIMESTAMP_SIZE],
    ) -> Status;

    /// Non-blocking read of one FD frame. The timestamp is in microseconds.
    fn read_fd(
        &self,
        channel: Handle,
        frame: &mut [u8; FD_FRAME_SIZE],
        timestamp: &mut u64,
    ) -> Status;

    fn write(&self, channel: Handle, frame: &[u8; CLASSIC_FRAME_SIZE]) -> Status;

    fn write_fd(&self, channel: Handle, frame: &[u8; FD_FRAME_SIZE]) -> Status;

    /// Widens the reception filter by the inclusive id range `from_id..=to_id`.
    fn filter_messages(&self, channel: Handle, from_id: u32, to_id: u32, mode: u8) -> Status;

    /// Reads a parameter into a caller-sized buffer.
    fn get_value(&self, channel: Handle, parameter: Parameter, buffer: &mut [u8]) -> Status;

    fn set_value(&self, channel: Handle, parameter: Parameter, buffer: &[u8]) -> Status;

    /// Writes a NUL-terminated description of `status` into `buffer`.
    fn get_error_text(
        &self,
        status: Status,
        language: Language,
        buffer: &mut [u8; MAX_STRING_BUFFER],
    ) -> Status;

    /// Creates an OS event and registers it as the channel's receive event.
    fn create_receive_event(&self, channel: Handle) -> io::Result<Box<dyn WaitEvent>>;
}
