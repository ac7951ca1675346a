use crate::data_link::native::FrameFormat;
use crate::driver::{Baudrate, Handle, Language};
use crate::error::{CanBusError, Result};
use crate::types::{BusMode, Config};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_US: u64 = 250;

/// Bus configuration, loadable from any serde format.
///
/// ```json
/// { "channel": "PCAN_USBBUS1", "baudRate": 500000, "busMode": "active" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusConfig {
    /// Vendor channel name, e.g. `PCAN_USBBUS1`
    pub channel: String,
    /// Classic bit rate in bits/s
    pub baud_rate: u32,
    pub bus_mode: BusMode,
    pub is_fd: bool,
    /// FD bit-rate string, passed to the driver verbatim
    pub fd_bitrate: Option<String>,
    pub recv_status_frames: bool,
    pub recv_rtr_frames: bool,
    pub recv_error_frames: bool,
    pub recv_echo_frames: bool,
    /// Language of driver error texts
    pub language: Language,
    /// Sleep between reads when no receive event is available
    pub poll_interval_us: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            channel: "PCAN_USBBUS1".to_string(),
            baud_rate: 500_000,
            bus_mode: BusMode::Active,
            is_fd: false,
            fd_bitrate: None,
            recv_status_frames: false,
            recv_rtr_frames: false,
            recv_error_frames: false,
            recv_echo_frames: false,
            language: Language::Neutral,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
        }
    }
}

impl Config for BusConfig {
    fn validate(&self) -> Result<()> {
        if self.handle()? == Handle::NONEBUS {
            return Err(CanBusError::InvalidChannel(self.channel.clone()));
        }
        if self.is_fd {
            match &self.fd_bitrate {
                Some(bitrate) if !bitrate.trim().is_empty() => {}
                _ => {
                    return Err(CanBusError::InvalidConfig(
                        "FD channel requires an fdBitrate string".into(),
                    ))
                }
            }
        } else {
            self.baudrate()?;
        }
        if self.poll_interval_us == 0 {
            return Err(CanBusError::InvalidConfig(
                "pollIntervalUs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl BusConfig {
    pub fn handle(&self) -> Result<Handle> {
        Handle::from_name(&self.channel)
            .ok_or_else(|| CanBusError::InvalidChannel(self.channel.clone()))
    }

    pub fn baudrate(&self) -> Result<Baudrate> {
        Baudrate::from_bits_per_second(self.baud_rate)
            .ok_or(CanBusError::InvalidBaudRate(self.baud_rate))
    }

    pub fn frame_format(&self) -> FrameFormat {
        if self.is_fd {
            FrameFormat::Fd
        } else {
            FrameFormat::Classic
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BusConfig::default();
        config.validate().unwrap();
        assert_eq!(config.handle().unwrap(), Handle::USBBUS1);
        assert_eq!(config.baudrate().unwrap(), Baudrate::BAUD_500K);
        assert_eq!(config.poll_interval(), Duration::from_micros(250));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: BusConfig = serde_json::from_str(
            r#"{
                "channel": "PCAN_USBBUS2",
                "baudRate": 250000,
                "busMode": "passive",
                "recvStatusFrames": true,
                "language": "english"
            }"#,
        )
        .unwrap();

        assert_eq!(config.handle().unwrap(), Handle::USBBUS2);
        assert_eq!(config.baud_rate, 250_000);
        assert_eq!(config.bus_mode, BusMode::Passive);
        assert!(config.recv_status_frames);
        assert!(!config.recv_echo_frames);
        assert_eq!(config.language, Language::English);
        assert_eq!(config.poll_interval_us, 250);
    }

    #[test]
    fn test_validate_rejections() {
        let unknown_channel = BusConfig {
            channel: "PCAN_USBBUS99".into(),
            ..BusConfig::default()
        };
        assert!(matches!(
            unknown_channel.validate(),
            Err(CanBusError::InvalidChannel(_))
        ));

        let odd_baud = BusConfig {
            baud_rate: 123_456,
            ..BusConfig::default()
        };
        assert!(matches!(
            odd_baud.validate(),
            Err(CanBusError::InvalidBaudRate(123_456))
        ));

        let fd_without_bitrate = BusConfig {
            is_fd: true,
            ..BusConfig::default()
        };
        assert!(matches!(
            fd_without_bitrate.validate(),
            Err(CanBusError::InvalidConfig(_))
        ));

        let no_poll = BusConfig {
            poll_interval_us: 0,
            ..BusConfig::default()
        };
        assert!(no_poll.validate().is_err());
    }

    #[test]
    fn test_fd_ignores_classic_baud() {
        let config = BusConfig {
            is_fd: true,
            baud_rate: 0,
            fd_bitrate: Some("f_clock_mhz=20,nom_brp=5,nom_tseg1=2,nom_tseg2=1,nom_sjw=1".into()),
            ..BusConfig::default()
        };
        config.validate().unwrap();
        assert_eq!(config.frame_format(), FrameFormat::Fd);
    }
}
