//! Virtual loopback driver.
//!
//! [`MockDriver`] implements [`NativeDriver`] over an in-memory bus: every
//! frame written on one initialized channel is delivered to every other
//! initialized channel, and back to the sender as an echo when echo frames
//! are allowed there. Reception switches, id-range filters, listen-only mode
//! and receive events behave like the hardware's. Test hooks inject frames,
//! change the bus status and force failures.

use crate::data_link::native::{
    FrameFormat, MessageType, NativeFrame, NativeTimestamp, CLASSIC_FRAME_SIZE, FD_DATA_LENGTH,
    FD_FRAME_SIZE, TIMESTAMP_SIZE,
};
use crate::data_link::STATUS_FRAME_STATE_POSITION;
use crate::driver::{
    Baudrate, Handle, Language, NativeDriver, Parameter, Status, WaitEvent, WaitOutcome,
    CHANNEL_AVAILABLE, CHANNEL_OCCUPIED, CHANNEL_UNAVAILABLE, FEATURE_FD_CAPABLE, FILTER_CLOSE,
    FILTER_CUSTOM, FILTER_OPEN, MAX_STRING_BUFFER, PARAMETER_OFF, PARAMETER_ON,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const HARDWARE_NAME: &str = "PCAN-USB";
const API_VERSION: &str = "4.6.0.0";

const ERROR_TEXTS: [(Status, &str); 20] = [
    (Status::OK, "No error"),
    (Status::XMTFULL, "Transmit buffer in CAN controller is full"),
    (Status::OVERRUN, "CAN controller was read too late"),
    (Status::BUSLIGHT, "Bus error: an error counter reached the 'light' limit"),
    (Status::BUSHEAVY, "Bus error: an error counter reached the 'heavy' limit"),
    (Status::BUSOFF, "Bus error: the CAN controller is in bus-off state"),
    (Status::QRCVEMPTY, "Receive queue is empty"),
    (Status::QOVERRUN, "Receive queue was read too late"),
    (Status::QXMTFULL, "Transmit queue is full"),
    (Status::NODRIVER, "Driver not loaded"),
    (Status::ILLHW, "Hardware handle is invalid"),
    (Status::RESOURCE, "Resource (FIFO, client, timeout) cannot be created"),
    (Status::ILLPARAMTYPE, "Invalid parameter"),
    (Status::ILLPARAMVAL, "Invalid parameter value"),
    (Status::UNKNOWN, "Unknown error"),
    (Status::ILLDATA, "Invalid data, function, or action"),
    (Status::BUSPASSIVE, "Bus error: the CAN controller is error passive"),
    (Status::CAUTION, "An operation was successfully carried out, however, irregularities were registered"),
    (Status::INITIALIZE, "Channel is not initialized"),
    (Status::ILLOPERATION, "Invalid operation"),
];

#[derive(Debug, Clone)]
struct QueuedFrame {
    id: u32,
    msg_type: MessageType,
    dlc: u8,
    data: [u8; FD_DATA_LENGTH],
    timestamp: u64,
}

impl QueuedFrame {
    fn new(frame: &NativeFrame, timestamp: u64) -> Self {
        let mut data = [0u8; FD_DATA_LENGTH];
        let raw = frame.raw_data();
        data[..raw.len()].copy_from_slice(raw);

        Self {
            id: frame.id(),
            msg_type: frame.msg_type(),
            dlc: frame.dlc(),
            data,
            timestamp,
        }
    }

    fn is_fd(&self) -> bool {
        self.msg_type.contains(MessageType::FD)
    }

    fn to_native(&self, format: FrameFormat) -> Option<NativeFrame> {
        NativeFrame::new(
            format,
            self.id,
            self.msg_type,
            self.dlc,
            &self.data[..format.capacity()],
        )
        .ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Acceptance {
    Open,
    Closed,
    /// Inclusive ranges with the native filter mode they were set with
    Ranges(Vec<(u32, u32, u8)>),
}

impl Acceptance {
    fn admits(&self, id: u32, extended: bool) -> bool {
        match self {
            Acceptance::Open => true,
            Acceptance::Closed => false,
            Acceptance::Ranges(ranges) => ranges.iter().any(|&(from, to, mode)| {
                // standard ranges only match 11-bit frames
                let width_ok = !extended || mode == MessageType::EXTENDED.bits();
                width_ok && (from..=to).contains(&id)
            }),
        }
    }
}

struct EventSignal {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl EventSignal {
    fn set(&self) {
        *self.signaled.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }
}

/// Auto-reset receive event handed out by [`MockDriver`].
struct MockEvent {
    signal: Arc<EventSignal>,
    released: Arc<AtomicUsize>,
}

impl WaitEvent for MockEvent {
    fn wait(&self, timeout: Option<Duration>) -> io::Result<WaitOutcome> {
        let guard = self
            .signal
            .signaled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut guard = match timeout {
            Some(timeout) => {
                self.signal
                    .cond
                    .wait_timeout_while(guard, timeout, |signaled| !*signaled)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => self
                .signal
                .cond
                .wait_while(guard, |signaled| !*signaled)
                .unwrap_or_else(PoisonError::into_inner),
        };

        if *guard {
            *guard = false;
            Ok(WaitOutcome::Signaled)
        } else {
            Ok(WaitOutcome::TimedOut)
        }
    }
}

impl Drop for MockEvent {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

struct ChannelState {
    /// Frame format while initialized
    format: Option<FrameFormat>,
    rx: VecDeque<QueuedFrame>,
    acceptance: Acceptance,
    params: HashMap<Parameter, u32>,
    bus_status: Status,
    event: Option<Arc<EventSignal>>,
}

impl ChannelState {
    fn new() -> Self {
        let params = [
            (Parameter::LISTEN_ONLY, PARAMETER_OFF),
            (Parameter::ALLOW_STATUS_FRAMES, PARAMETER_ON),
            (Parameter::ALLOW_RTR_FRAMES, PARAMETER_ON),
            (Parameter::ALLOW_ERROR_FRAMES, PARAMETER_OFF),
            (Parameter::ALLOW_ECHO_FRAMES, PARAMETER_OFF),
            (Parameter::CHANNEL_IDENTIFYING, PARAMETER_OFF),
            (Parameter::BUSOFF_AUTORESET, PARAMETER_OFF),
            (Parameter::RECEIVE_EVENT, 0),
            (Parameter::DEVICE_ID, 0),
        ];

        Self {
            format: None,
            rx: VecDeque::new(),
            acceptance: Acceptance::Open,
            params: params.into_iter().collect(),
            bus_status: Status::OK,
            event: None,
        }
    }

    fn switch(&self, parameter: Parameter) -> bool {
        self.params.get(&parameter) == Some(&PARAMETER_ON)
    }

    /// Queues `frame` if the channel is initialized and lets it through.
    fn offer(&mut self, frame: QueuedFrame) {
        let Some(format) = self.format else {
            return;
        };
        if format == FrameFormat::Classic && frame.is_fd() {
            return;
        }

        let msg_type = frame.msg_type;
        let opt_ins = [
            (MessageType::STATUS, Parameter::ALLOW_STATUS_FRAMES),
            (MessageType::ERRFRAME, Parameter::ALLOW_ERROR_FRAMES),
            (MessageType::RTR, Parameter::ALLOW_RTR_FRAMES),
            (MessageType::ECHO, Parameter::ALLOW_ECHO_FRAMES),
        ];
        if opt_ins
            .iter()
            .any(|&(bit, parameter)| msg_type.contains(bit) && !self.switch(parameter))
        {
            return;
        }

        let is_data = !msg_type.intersects(MessageType::STATUS | MessageType::ERRFRAME);
        if is_data
            && !self
                .acceptance
                .admits(frame.id, msg_type.contains(MessageType::EXTENDED))
        {
            return;
        }

        self.rx.push_back(frame);
        if let Some(event) = &self.event {
            event.set();
        }
    }

    fn uninitialize(&mut self) {
        self.format = None;
        self.rx.clear();
        self.acceptance = Acceptance::Open;
        self.event = None;
    }
}

struct MockState {
    channels: HashMap<Handle, ChannelState>,
    unsupported: HashSet<Parameter>,
    transmit_queue_full: bool,
    fail_events: bool,
    unloaded: bool,
    events_created: usize,
}

/// In-memory [`NativeDriver`] for tests and hardware-free development.
pub struct MockDriver {
    state: Mutex<MockState>,
    events_released: Arc<AtomicUsize>,
    epoch: Instant,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Driver with no channel plugged in.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                channels: HashMap::new(),
                unsupported: HashSet::new(),
                transmit_queue_full: false,
                fail_events: false,
                unloaded: false,
                events_created: 0,
            }),
            events_released: Arc::new(AtomicUsize::new(0)),
            epoch: Instant::now(),
        }
    }

    pub fn with_channels(channels: &[Handle]) -> Self {
        let driver = Self::new();
        for &channel in channels {
            driver.plug(channel);
        }
        driver
    }

    /// Attaches a device on `channel`.
    pub fn plug(&self, channel: Handle) {
        self.state()
            .channels
            .entry(channel)
            .or_insert_with(ChannelState::new);
    }

    /// Delivers a frame to `channel` as if it came off the wire.
    pub fn inject(&self, channel: Handle, frame: &NativeFrame) {
        let queued = QueuedFrame::new(frame, self.now());
        if let Some(state) = self.state().channels.get_mut(&channel) {
            state.offer(queued);
        }
    }

    /// Sets the controller status reported by `channel` and queues a status
    /// frame carrying it.
    pub fn set_bus_status(&self, channel: Handle, status: Status) {
        let timestamp = self.now();
        let mut state = self.state();
        let Some(channel) = state.channels.get_mut(&channel) else {
            return;
        };
        channel.bus_status = status;

        let mut data = [0u8; STATUS_FRAME_STATE_POSITION + 1];
        data[STATUS_FRAME_STATE_POSITION] = (status.bits() & 0xFF) as u8;
        if let Ok(frame) = NativeFrame::new(
            FrameFormat::Classic,
            0,
            MessageType::STATUS,
            data.len() as u8,
            &data,
        ) {
            channel.offer(QueuedFrame::new(&frame, timestamp));
        }
    }

    /// Makes every write report a full transmit queue.
    pub fn set_transmit_queue_full(&self, full: bool) {
        self.state().transmit_queue_full = full;
    }

    /// Makes receive event creation fail at the OS level.
    pub fn fail_receive_events(&self, fail: bool) {
        self.state().fail_events = fail;
    }

    /// Makes get/set of `parameter` report an illegal parameter type.
    pub fn mark_unsupported(&self, parameter: Parameter) {
        self.state().unsupported.insert(parameter);
    }

    /// Every later call reports a missing driver.
    pub fn unload(&self) {
        self.state().unloaded = true;
    }

    pub fn events_created(&self) -> usize {
        self.state().events_created
    }

    pub fn events_released(&self) -> usize {
        self.events_released.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self, channel: Handle) -> bool {
        self.state()
            .channels
            .get(&channel)
            .is_some_and(|state| state.format.is_some())
    }

    /// Frames waiting in the receive queue of `channel`.
    pub fn queued(&self, channel: Handle) -> usize {
        self.state()
            .channels
            .get(&channel)
            .map_or(0, |state| state.rx.len())
    }

    /// Last value set for a parameter, as stored by the driver.
    pub fn parameter(&self, channel: Handle, parameter: Parameter) -> Option<u32> {
        self.state()
            .channels
            .get(&channel)
            .and_then(|state| state.params.get(&parameter).copied())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    fn open(&self, channel: Handle, format: FrameFormat) -> Status {
        let mut state = self.state();
        if state.unloaded {
            return Status::NODRIVER;
        }
        let Some(channel) = state.channels.get_mut(&channel) else {
            return Status::ILLHW;
        };
        if channel.format.is_some() {
            return Status::ILLOPERATION;
        }
        channel.format = Some(format);
        channel.bus_status = Status::OK;
        Status::OK
    }

    /// Runs `f` on an initialized channel.
    fn with_initialized<F>(&self, channel: Handle, f: F) -> Status
    where
        F: FnOnce(&mut MockState, Handle) -> Status,
    {
        let mut state = self.state();
        if state.unloaded {
            return Status::NODRIVER;
        }
        let initialized = match state.channels.get(&channel) {
            Some(channel_state) => channel_state.format.is_some(),
            None => return Status::ILLHW,
        };
        if !initialized {
            return Status::INITIALIZE;
        }
        f(&mut *state, channel)
    }

    fn transmit(&self, channel: Handle, format: FrameFormat, record: &[u8]) -> Status {
        let timestamp = self.now();
        self.with_initialized(channel, |state, sender| {
            let transmit_queue_full = state.transmit_queue_full;
            let Some(channel) = state.channels.get_mut(&sender) else {
                return Status::ILLHW;
            };

            if channel.bus_status.contains(Status::BUSOFF) {
                return channel.bus_status;
            }
            if channel.format != Some(format) || channel.switch(Parameter::LISTEN_ONLY) {
                return Status::ILLOPERATION;
            }
            if transmit_queue_full {
                return Status::QXMTFULL;
            }
            let frame = match NativeFrame::read_from(format, record) {
                Ok(frame) => frame,
                Err(_) => return Status::ILLDATA,
            };
            let advisory = channel.bus_status.advisory();

            let queued = QueuedFrame::new(&frame, timestamp);
            for (handle, receiver) in state.channels.iter_mut() {
                if *handle == sender {
                    let mut echo = queued.clone();
                    echo.msg_type |= MessageType::ECHO;
                    receiver.offer(echo);
                } else {
                    receiver.offer(queued.clone());
                }
            }
            advisory
        })
    }

    fn receive(&self, channel: Handle, format: FrameFormat, record: &mut [u8]) -> (Status, u64) {
        let mut timestamp = 0;
        let status = self.with_initialized(channel, |state, handle| {
            let Some(channel) = state.channels.get_mut(&handle) else {
                return Status::ILLHW;
            };
            if channel.format != Some(format) {
                return Status::ILLOPERATION;
            }

            let Some(frame) = channel.rx.pop_front() else {
                return channel.bus_status | Status::QRCVEMPTY;
            };
            let written = frame
                .to_native(format)
                .and_then(|native| native.write_to(record).ok());
            if written.is_none() {
                return Status::ILLDATA;
            }
            timestamp = frame.timestamp;
            channel.bus_status
        });
        (status, timestamp)
    }

    fn write_string(buffer: &mut [u8], text: &str) -> Status {
        let bytes = text.as_bytes();
        if buffer.len() <= bytes.len() {
            return Status::ILLPARAMVAL;
        }
        buffer[..bytes.len()].copy_from_slice(bytes);
        buffer[bytes.len()] = 0;
        Status::OK
    }

    fn write_u32(buffer: &mut [u8], value: u32) -> Status {
        if buffer.len() < 4 {
            return Status::ILLPARAMVAL;
        }
        buffer[..4].copy_from_slice(&value.to_le_bytes());
        Status::OK
    }
}

impl NativeDriver for MockDriver {
    fn initialize(&self, channel: Handle, baudrate: Baudrate) -> Status {
        if baudrate.bits_per_second().is_none() {
            return Status::ILLPARAMVAL;
        }
        self.open(channel, FrameFormat::Classic)
    }

    fn initialize_fd(&self, channel: Handle, bitrate: &str) -> Status {
        if bitrate.trim().is_empty() {
            return Status::ILLPARAMVAL;
        }
        self.open(channel, FrameFormat::Fd)
    }

    fn uninitialize(&self, channel: Handle) -> Status {
        if channel == Handle::NONEBUS {
            let mut state = self.state();
            if state.unloaded {
                return Status::NODRIVER;
            }
            state
                .channels
                .values_mut()
                .for_each(ChannelState::uninitialize);
            return Status::OK;
        }

        self.with_initialized(channel, |state, handle| {
            if let Some(channel) = state.channels.get_mut(&handle) {
                channel.uninitialize();
            }
            Status::OK
        })
    }

    fn reset(&self, channel: Handle) -> Status {
        self.with_initialized(channel, |state, handle| {
            if let Some(channel) = state.channels.get_mut(&handle) {
                channel.rx.clear();
            }
            Status::OK
        })
    }

    fn get_status(&self, channel: Handle) -> Status {
        self.with_initialized(channel, |state, handle| {
            state
                .channels
                .get(&handle)
                .map_or(Status::ILLHW, |channel| channel.bus_status)
        })
    }

    fn read(
        &self,
        channel: Handle,
        frame: &mut [u8; CLASSIC_FRAME_SIZE],
        timestamp: &mut [u8; TIMESTAMP_SIZE],
    ) -> Status {
        let (status, micros) = self.receive(channel, FrameFormat::Classic, frame);
        NativeTimestamp::from_micros(micros).write_to(timestamp);
        status
    }

    fn read_fd(
        &self,
        channel: Handle,
        frame: &mut [u8; FD_FRAME_SIZE],
        timestamp: &mut u64,
    ) -> Status {
        let (status, micros) = self.receive(channel, FrameFormat::Fd, frame);
        *timestamp = micros;
        status
    }

    fn write(&self, channel: Handle, frame: &[u8; CLASSIC_FRAME_SIZE]) -> Status {
        self.transmit(channel, FrameFormat::Classic, frame)
    }

    fn write_fd(&self, channel: Handle, frame: &[u8; FD_FRAME_SIZE]) -> Status {
        self.transmit(channel, FrameFormat::Fd, frame)
    }

    fn filter_messages(&self, channel: Handle, from_id: u32, to_id: u32, mode: u8) -> Status {
        if from_id > to_id
            || (mode != MessageType::STANDARD.bits() && mode != MessageType::EXTENDED.bits())
        {
            return Status::ILLPARAMVAL;
        }

        self.with_initialized(channel, |state, handle| {
            let Some(channel) = state.channels.get_mut(&handle) else {
                return Status::ILLHW;
            };
            match &mut channel.acceptance {
                Acceptance::Ranges(ranges) => ranges.push((from_id, to_id, mode)),
                acceptance => *acceptance = Acceptance::Ranges(vec![(from_id, to_id, mode)]),
            }
            Status::OK
        })
    }

    fn get_value(&self, channel: Handle, parameter: Parameter, buffer: &mut [u8]) -> Status {
        let state = self.state();
        if state.unloaded {
            return Status::NODRIVER;
        }
        if state.unsupported.contains(&parameter) {
            return Status::ILLPARAMTYPE;
        }

        match parameter {
            Parameter::ATTACHED_CHANNELS_COUNT => {
                let count = u32::try_from(state.channels.len()).unwrap_or(u32::MAX);
                return Self::write_u32(buffer, count);
            }
            Parameter::CHANNEL_CONDITION => {
                let condition = match state.channels.get(&channel) {
                    Some(channel) if channel.format.is_some() => CHANNEL_OCCUPIED,
                    Some(_) => CHANNEL_AVAILABLE,
                    None => CHANNEL_UNAVAILABLE,
                };
                return Self::write_u32(buffer, condition);
            }
            Parameter::API_VERSION => return Self::write_string(buffer, API_VERSION),
            _ => {}
        }

        let Some(channel) = state.channels.get(&channel) else {
            return Status::ILLHW;
        };
        match parameter {
            Parameter::HARDWARE_NAME => Self::write_string(buffer, HARDWARE_NAME),
            Parameter::CHANNEL_FEATURES => Self::write_u32(buffer, FEATURE_FD_CAPABLE),
            Parameter::MESSAGE_FILTER => {
                let value = match channel.acceptance {
                    Acceptance::Open => FILTER_OPEN,
                    Acceptance::Closed => FILTER_CLOSE,
                    Acceptance::Ranges(_) => FILTER_CUSTOM,
                };
                Self::write_u32(buffer, value)
            }
            _ => match channel.params.get(&parameter) {
                Some(&value) => Self::write_u32(buffer, value),
                None => Status::ILLPARAMTYPE,
            },
        }
    }

    fn set_value(&self, channel: Handle, parameter: Parameter, buffer: &[u8]) -> Status {
        let mut state = self.state();
        if state.unloaded {
            return Status::NODRIVER;
        }
        if state.unsupported.contains(&parameter) {
            return Status::ILLPARAMTYPE;
        }
        let Ok(raw) = <[u8; 4]>::try_from(buffer) else {
            return Status::ILLPARAMVAL;
        };
        let value = u32::from_le_bytes(raw);
        let Some(channel) = state.channels.get_mut(&channel) else {
            return Status::ILLHW;
        };

        match parameter {
            Parameter::MESSAGE_FILTER => {
                channel.acceptance = match value {
                    FILTER_OPEN => Acceptance::Open,
                    FILTER_CLOSE => Acceptance::Closed,
                    _ => return Status::ILLPARAMVAL,
                };
                Status::OK
            }
            Parameter::LISTEN_ONLY
            | Parameter::ALLOW_STATUS_FRAMES
            | Parameter::ALLOW_RTR_FRAMES
            | Parameter::ALLOW_ERROR_FRAMES
            | Parameter::ALLOW_ECHO_FRAMES
            | Parameter::CHANNEL_IDENTIFYING
            | Parameter::BUSOFF_AUTORESET => {
                if value != PARAMETER_OFF && value != PARAMETER_ON {
                    return Status::ILLPARAMVAL;
                }
                channel.params.insert(parameter, value);
                Status::OK
            }
            Parameter::DEVICE_ID => {
                channel.params.insert(parameter, value);
                Status::OK
            }
            _ => Status::ILLPARAMTYPE,
        }
    }

    fn get_error_text(
        &self,
        status: Status,
        _language: Language,
        buffer: &mut [u8; MAX_STRING_BUFFER],
    ) -> Status {
        match ERROR_TEXTS.iter().find(|(known, _)| *known == status) {
            Some((_, text)) => Self::write_string(buffer, text),
            None => Status::ILLPARAMVAL,
        }
    }

    fn create_receive_event(&self, channel: Handle) -> io::Result<Box<dyn WaitEvent>> {
        let mut state = self.state();
        if state.fail_events {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "receive event could not be created",
            ));
        }
        let Some(channel) = state.channels.get_mut(&channel) else {
            return Err(io::Error::new(io::ErrorKind::NotFound, "unknown channel"));
        };

        let signal = Arc::new(EventSignal {
            signaled: Mutex::new(false),
            cond: Condvar::new(),
        });
        channel.event = Some(Arc::clone(&signal));
        state.events_created += 1;

        Ok(Box::new(MockEvent {
            signal,
            released: Arc::clone(&self.events_released),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic(id: u32, msg_type: MessageType, data: &[u8]) -> [u8; CLASSIC_FRAME_SIZE] {
        let frame =
            NativeFrame::new(FrameFormat::Classic, id, msg_type, data.len() as u8, data).unwrap();
        let mut record = [0u8; CLASSIC_FRAME_SIZE];
        frame.write_to(&mut record).unwrap();
        record
    }

    #[test]
    fn test_delivery_between_channels() {
        let driver = MockDriver::with_channels(&[Handle::USBBUS1, Handle::USBBUS2]);
        assert!(driver.initialize(Handle::USBBUS1, Baudrate::BAUD_500K).is_ok());
        assert!(driver.initialize(Handle::USBBUS2, Baudrate::BAUD_500K).is_ok());

        let record = classic(0x42, MessageType::STANDARD, &[1, 2]);
        assert!(driver.write(Handle::USBBUS1, &record).is_ok());

        // no echo by default
        assert_eq!(driver.queued(Handle::USBBUS1), 0);
        assert_eq!(driver.queued(Handle::USBBUS2), 1);

        let mut out = [0u8; CLASSIC_FRAME_SIZE];
        let mut ts = [0u8; TIMESTAMP_SIZE];
        assert!(driver.read(Handle::USBBUS2, &mut out, &mut ts).is_ok());
        assert_eq!(out, record);
        assert_eq!(
            driver.read(Handle::USBBUS2, &mut out, &mut ts),
            Status::QRCVEMPTY
        );
    }

    #[test]
    fn test_uninitialized_channel() {
        let driver = MockDriver::with_channels(&[Handle::USBBUS1]);
        assert_eq!(driver.get_status(Handle::USBBUS1), Status::INITIALIZE);
        assert_eq!(driver.uninitialize(Handle::USBBUS1), Status::INITIALIZE);
        assert_eq!(driver.get_status(Handle::USBBUS9), Status::ILLHW);
    }

    #[test]
    fn test_filter_ranges() {
        let acceptance = Acceptance::Ranges(vec![(0x100, 0x200, MessageType::STANDARD.bits())]);
        assert!(acceptance.admits(0x100, false));
        assert!(acceptance.admits(0x200, false));
        assert!(!acceptance.admits(0x201, false));
        assert!(!acceptance.admits(0x150, true));
        assert!(!Acceptance::Closed.admits(0x150, false));
    }

    #[test]
    fn test_event_auto_resets() {
        let driver = MockDriver::with_channels(&[Handle::USBBUS1]);
        driver.initialize(Handle::USBBUS1, Baudrate::BAUD_500K);
        let event = driver.create_receive_event(Handle::USBBUS1).unwrap();

        driver.inject(
            Handle::USBBUS1,
            &NativeFrame::new(FrameFormat::Classic, 1, MessageType::STANDARD, 0, &[]).unwrap(),
        );
        assert_eq!(
            event.wait(Some(Duration::from_millis(10))).unwrap(),
            WaitOutcome::Signaled
        );
        assert_eq!(
            event.wait(Some(Duration::from_millis(10))).unwrap(),
            WaitOutcome::TimedOut
        );

        drop(event);
        assert_eq!(driver.events_created(), 1);
        assert_eq!(driver.events_released(), 1);
    }

    #[test]
    fn test_error_text() {
        let driver = MockDriver::new();
        let mut buffer = [0u8; MAX_STRING_BUFFER];
        assert!(driver
            .get_error_text(Status::QXMTFULL, Language::English, &mut buffer)
            .is_ok());
        assert!(buffer.starts_with(b"Transmit queue is full\0"));

        assert_eq!(
            driver.get_error_text(Status::from_raw(0x1000_0000), Language::English, &mut buffer),
            Status::ILLPARAMVAL
        );
    }
}
