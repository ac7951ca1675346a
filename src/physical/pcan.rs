use super::{check_status, describe, Bus, BusConfig, LifecycleState};
use crate::data_link::native::{FrameFormat, MessageType, CLASSIC_FRAME_SIZE, FD_FRAME_SIZE};
use crate::data_link::{self, BusStatus};
use crate::driver::{
    Baudrate, Handle, NativeDriver, Parameter, Status, WaitEvent, FILTER_OPEN, PARAMETER_OFF,
    PARAMETER_ON,
};
use crate::error::{CanBusError, Result};
use crate::types::{
    BusMode, ChannelCondition, Config, FilterMode, Message, EXTENDED_ID_MASK, STANDARD_ID_MASK,
};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Bit rate a channel was initialized with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bitrate {
    Classic(Baudrate),
    /// Opaque FD bit-rate string
    Fd(String),
}

/// Per-channel state owned by an initialized bus.
///
/// Holds the receive event when one could be acquired. Whether the receive
/// engine blocks on the event or polls is decided here, per channel.
pub struct ChannelHandle {
    handle: Handle,
    bitrate: Bitrate,
    bus_mode: BusMode,
    format: FrameFormat,
    pub(super) receive_event: Option<Box<dyn WaitEvent>>,
}

impl ChannelHandle {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn bitrate(&self) -> &Bitrate {
        &self.bitrate
    }

    pub fn bus_mode(&self) -> BusMode {
        self.bus_mode
    }

    pub fn is_fd(&self) -> bool {
        self.format == FrameFormat::Fd
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// False when the channel degraded to polling.
    pub fn uses_receive_event(&self) -> bool {
        self.receive_event.is_some()
    }
}

impl fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("handle", &self.handle)
            .field("bitrate", &self.bitrate)
            .field("bus_mode", &self.bus_mode)
            .field("format", &self.format)
            .field("receive_event", &self.receive_event.is_some())
            .finish()
    }
}

/// CAN / CAN-FD bus on one hardware channel of a PCAN-Basic style driver.
pub struct PcanBus<D: NativeDriver> {
    pub(super) driver: Arc<D>,
    pub(super) config: BusConfig,
    handle: Handle,
    state: LifecycleState,
    pub(super) channel: Option<ChannelHandle>,
    advisory: Cell<Status>,
}

impl<D: NativeDriver> PcanBus<D> {
    /// Creates an uninitialized bus for the configured channel.
    pub fn new(driver: Arc<D>, config: BusConfig) -> Result<Self> {
        config.validate()?;
        let handle = config.handle()?;

        Ok(Self {
            driver,
            config,
            handle,
            state: LifecycleState::Uninitialized,
            channel: None,
            advisory: Cell::new(Status::OK),
        })
    }

    /// Creates, initializes and configures a bus in one call.
    ///
    /// Applies the listen-only mode and the status/RTR/error/echo reception
    /// switches from the configuration.
    pub fn open(driver: Arc<D>, config: BusConfig) -> Result<Self> {
        let mut bus = Self::new(driver, config)?;
        bus.initialize()?;

        if let Err(err) = bus.apply_config() {
            if let Err(shutdown_err) = bus.shutdown() {
                warn!(channel = %bus.handle, error = %shutdown_err, "shutdown after failed configuration");
            }
            return Err(err);
        }

        Ok(bus)
    }

    /// Initializes the hardware channel and acquires its receive event.
    ///
    /// Failing to acquire the event is not an error: this channel then polls
    /// for the rest of its lifetime.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != LifecycleState::Uninitialized {
            return Err(CanBusError::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }

        let format = self.config.frame_format();
        let (status, bitrate) = match format {
            FrameFormat::Classic => {
                let baudrate = self.config.baudrate()?;
                (
                    self.driver.initialize(self.handle, baudrate),
                    Bitrate::Classic(baudrate),
                )
            }
            FrameFormat::Fd => {
                let bitrate = self.config.fd_bitrate.clone().unwrap_or_default();
                (
                    self.driver.initialize_fd(self.handle, &bitrate),
                    Bitrate::Fd(bitrate),
                )
            }
        };
        self.check(status, None)?;

        let receive_event = match self.driver.create_receive_event(self.handle) {
            Ok(event) => Some(event),
            Err(err) => {
                warn!(channel = %self.handle, error = %err, "receive event unavailable, polling instead");
                None
            }
        };

        self.channel = Some(ChannelHandle {
            handle: self.handle,
            bitrate,
            bus_mode: self.config.bus_mode,
            format,
            receive_event,
        });
        self.state = LifecycleState::Initialized;
        debug!(channel = %self.handle, ?format, "channel initialized");
        Ok(())
    }

    fn apply_config(&mut self) -> Result<()> {
        let listen_only = self.config.bus_mode == BusMode::Passive;
        self.set_parameter(Parameter::LISTEN_ONLY, switch(listen_only))?;

        let switches = [
            (Parameter::ALLOW_STATUS_FRAMES, self.config.recv_status_frames),
            (Parameter::ALLOW_RTR_FRAMES, self.config.recv_rtr_frames),
            (Parameter::ALLOW_ERROR_FRAMES, self.config.recv_error_frames),
            (Parameter::ALLOW_ECHO_FRAMES, self.config.recv_echo_frames),
        ];
        for (parameter, enabled) in switches {
            match self.set_parameter(parameter, switch(enabled)) {
                Ok(()) => {}
                // older hardware lacks some of the reception switches
                Err(CanBusError::UnsupportedParameter { .. }) => {
                    warn!(channel = %self.handle, parameter = parameter.0, "reception switch not supported");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Uninitializes the channel and releases its receive event.
    ///
    /// The event is released even when the driver reports an error.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.state != LifecycleState::Initialized {
            return Err(CanBusError::InvalidState {
                operation: "shutdown",
                state: self.state,
            });
        }

        let status = self.driver.uninitialize(self.handle);
        // dropping the handle releases the receive event
        self.channel = None;
        self.state = LifecycleState::ShutDown;
        debug!(channel = %self.handle, "channel shut down");

        self.check(status, None).map(|_| ())
    }

    /// Clears the channel's receive and transmit queues.
    pub fn reset(&mut self) -> Result<()> {
        self.channel("reset")?;
        let status = self.driver.reset(self.handle);
        self.check(status, None).map(|_| ())
    }

    /// Sends one message. A full transmit queue surfaces as
    /// [`CanBusError::TransmitQueueFull`].
    pub fn send(&mut self, msg: &Message) -> Result<()> {
        let channel = self.channel("send")?;
        let frame = data_link::encode(msg, channel.format)?;

        let status = match channel.format {
            FrameFormat::Classic => {
                let mut record = [0u8; CLASSIC_FRAME_SIZE];
                frame.write_to(&mut record)?;
                self.driver.write(self.handle, &record)
            }
            FrameFormat::Fd => {
                let mut record = [0u8; FD_FRAME_SIZE];
                frame.write_to(&mut record)?;
                self.driver.write_fd(self.handle, &record)
            }
        };
        trace!(channel = %self.handle, id = msg.id, dlc = frame.dlc(), %status, "write");

        self.check(status, None).map(|_| ())
    }

    /// Accepts the inclusive id range `from_id..=to_id` in addition to any
    /// range already registered.
    pub fn set_filter(&mut self, from_id: u32, to_id: u32, mode: FilterMode) -> Result<()> {
        self.channel("set filter")?;

        let (mask, extended) = match mode {
            FilterMode::Standard => (STANDARD_ID_MASK, false),
            FilterMode::Extended => (EXTENDED_ID_MASK, true),
        };
        for id in [from_id, to_id] {
            if id & !mask != 0 {
                return Err(CanBusError::InvalidId { id, extended });
            }
        }
        if from_id > to_id {
            return Err(CanBusError::InvalidConfig(format!(
                "filter range {:#x}..={:#x} is empty",
                from_id, to_id
            )));
        }

        let status = self
            .driver
            .filter_messages(self.handle, from_id, to_id, filter_mode_bits(mode));
        debug!(channel = %self.handle, from_id, to_id, ?mode, "filter set");
        self.check(status, Some(Parameter::MESSAGE_FILTER)).map(|_| ())
    }

    /// Fully re-opens reception.
    pub fn reset_filter(&mut self) -> Result<()> {
        self.channel("reset filter")?;
        self.set_parameter(Parameter::MESSAGE_FILTER, FILTER_OPEN)
    }

    /// Raw native status of the channel. Advisory bits are returned, not
    /// raised.
    pub fn status(&self) -> Result<Status> {
        self.channel("read status")?;
        let status = self.driver.get_status(self.handle);
        self.check(status, None)
    }

    /// True only when the driver reports no condition at all.
    pub fn status_is_okay(&self) -> Result<bool> {
        self.channel("read status")?;
        Ok(self.driver.get_status(self.handle).is_ok())
    }

    /// Controller error state.
    pub fn bus_status(&self) -> Result<BusStatus> {
        self.channel("read status")?;
        Ok(BusStatus::from_status(self.driver.get_status(self.handle)))
    }

    pub fn bus_mode(&self) -> BusMode {
        self.config.bus_mode
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Channel state, present only while initialized.
    pub fn channel_handle(&self) -> Option<&ChannelHandle> {
        self.channel.as_ref()
    }

    /// Advisory bits (bus light/heavy/passive) seen by the last call that
    /// reported any.
    pub fn advisory_status(&self) -> Status {
        self.advisory.get()
    }

    pub fn channel_condition(&self) -> Result<ChannelCondition> {
        let value = self.get_parameter(Parameter::CHANNEL_CONDITION)?;
        Ok(ChannelCondition::from_native(value))
    }

    /// Blinks the device LED for physical identification.
    pub fn set_identifying(&mut self, on: bool) -> Result<()> {
        self.set_parameter(Parameter::CHANNEL_IDENTIFYING, switch(on))
    }

    /// Reads a 32-bit parameter.
    pub fn get_parameter(&self, parameter: Parameter) -> Result<u32> {
        let mut buffer = [0u8; 4];
        self.get_value(parameter, &mut buffer)?;
        Ok(u32::from_le_bytes(buffer))
    }

    /// Writes a 32-bit parameter.
    pub fn set_parameter(&mut self, parameter: Parameter, value: u32) -> Result<()> {
        self.set_value(parameter, &value.to_le_bytes())?;
        debug!(channel = %self.handle, parameter = parameter.0, value, "parameter set");
        Ok(())
    }

    /// Reads a parameter into a caller-sized buffer. No type checking
    /// happens here; the buffer must have the size the parameter expects.
    pub fn get_value(&self, parameter: Parameter, buffer: &mut [u8]) -> Result<()> {
        self.parameters_allowed("get parameter")?;
        let status = self.driver.get_value(self.handle, parameter, buffer);
        self.check(status, Some(parameter)).map(|_| ())
    }

    pub fn set_value(&mut self, parameter: Parameter, buffer: &[u8]) -> Result<()> {
        self.parameters_allowed("set parameter")?;
        let status = self.driver.set_value(self.handle, parameter, buffer);
        self.check(status, Some(parameter)).map(|_| ())
    }

    /// Reads a NUL-terminated string parameter of at most `capacity` bytes,
    /// e.g. the hardware name.
    pub fn get_string(&self, parameter: Parameter, capacity: usize) -> Result<String> {
        let mut buffer = vec![0u8; capacity];
        self.get_value(parameter, &mut buffer)?;
        Ok(super::c_string(&buffer))
    }

    /// Driver text for `status` in the configured language.
    pub fn describe_status(&self, status: Status) -> String {
        describe(self.driver.as_ref(), status, self.config.language)
    }

    /// Channel state when initialized, invalid-state error otherwise.
    pub(super) fn channel(&self, operation: &'static str) -> Result<&ChannelHandle> {
        match (&self.channel, self.state) {
            (Some(channel), LifecycleState::Initialized) => Ok(channel),
            _ => Err(CanBusError::InvalidState {
                operation,
                state: self.state,
            }),
        }
    }

    // the driver accepts parameter calls before initialization
    fn parameters_allowed(&self, operation: &'static str) -> Result<()> {
        if self.state == LifecycleState::ShutDown {
            return Err(CanBusError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    pub(super) fn check(&self, status: Status, parameter: Option<Parameter>) -> Result<Status> {
        let status = check_status(
            self.driver.as_ref(),
            self.config.language,
            status,
            parameter,
        )?;

        let advisory = status.advisory();
        if !advisory.is_empty() {
            if advisory != self.advisory.get() {
                warn!(channel = %self.handle, status = %advisory, "bus condition");
            }
            self.advisory.set(advisory);
        }
        Ok(status)
    }
}

impl<D: NativeDriver> Drop for PcanBus<D> {
    fn drop(&mut self) {
        if self.state == LifecycleState::Initialized {
            if let Err(err) = self.shutdown() {
                warn!(channel = %self.handle, error = %err, "shutdown on drop failed");
            }
        }
    }
}

impl<D: NativeDriver> Bus for PcanBus<D> {
    fn send(&mut self, msg: &Message) -> Result<()> {
        PcanBus::send(self, msg)
    }

    fn recv(&mut self, timeout_ms: i32) -> Result<Option<Message>> {
        PcanBus::recv(self, timeout_ms)
    }

    fn status_is_okay(&self) -> Result<bool> {
        PcanBus::status_is_okay(self)
    }

    fn status(&self) -> Result<u32> {
        PcanBus::status(self).map(|status| status.bits())
    }

    fn bus_mode(&self) -> BusMode {
        PcanBus::bus_mode(self)
    }

    fn read_buffer(&mut self, limit: u16) -> Result<Vec<Message>> {
        PcanBus::read_buffer(self, limit)
    }

    fn set_filter(&mut self, from_id: u32, to_id: u32, mode: FilterMode) -> Result<()> {
        PcanBus::set_filter(self, from_id, to_id, mode)
    }

    fn reset_filter(&mut self) -> Result<()> {
        PcanBus::reset_filter(self)
    }

    fn reset(&mut self) -> Result<()> {
        PcanBus::reset(self)
    }

    fn shutdown(&mut self) -> Result<()> {
        PcanBus::shutdown(self)
    }

    fn channel_condition(&self) -> Result<ChannelCondition> {
        PcanBus::channel_condition(self)
    }
}

fn switch(on: bool) -> u32 {
    if on {
        PARAMETER_ON
    } else {
        PARAMETER_OFF
    }
}

/// Native filter mode value (the message-type bit of the id width)
pub fn filter_mode_bits(mode: FilterMode) -> u8 {
    match mode {
        FilterMode::Standard => MessageType::STANDARD.bits(),
        FilterMode::Extended => MessageType::EXTENDED.bits(),
    }
}
