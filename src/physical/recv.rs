use super::pcan::PcanBus;
use crate::data_link::native::{
    FrameFormat, MessageType, NativeFrame, NativeTimestamp, CLASSIC_FRAME_SIZE, FD_FRAME_SIZE,
    TIMESTAMP_SIZE,
};
use crate::data_link::{self, status_frame_state};
use crate::driver::{NativeDriver, Status};
use crate::error::Result;
use crate::types::Message;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Result of one non-blocking native read
enum ReadOutcome {
    Frame(Message),
    /// A frame arrived but the channel did not opt in to its kind.
    Discarded,
    Empty,
}

impl<D: NativeDriver> PcanBus<D> {
    /// Receives one message, waiting at most `timeout_ms` milliseconds.
    ///
    /// A negative timeout waits without limit. Between reads the channel
    /// blocks on its receive event if it has one, and sleeps for the poll
    /// interval otherwise. Discarded frames do not extend the deadline.
    pub fn recv(&mut self, timeout_ms: i32) -> Result<Option<Message>> {
        let deadline = u64::try_from(timeout_ms)
            .ok()
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        loop {
            match self.read_single()? {
                ReadOutcome::Frame(msg) => return Ok(Some(msg)),
                ReadOutcome::Discarded => {
                    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                        return Ok(None);
                    }
                }
                ReadOutcome::Empty => {
                    let remaining = match deadline {
                        Some(deadline) => {
                            let now = Instant::now();
                            if now >= deadline {
                                return Ok(None);
                            }
                            Some(deadline - now)
                        }
                        None => None,
                    };
                    self.wait_for_frames(remaining)?;
                }
            }
        }
    }

    /// Drains queued messages without waiting. A `limit` of 0 drains all.
    pub fn read_buffer(&mut self, limit: u16) -> Result<Vec<Message>> {
        let mut messages = Vec::new();

        loop {
            match self.read_single()? {
                ReadOutcome::Frame(msg) => {
                    messages.push(msg);
                    if limit != 0 && messages.len() >= usize::from(limit) {
                        break;
                    }
                }
                ReadOutcome::Discarded => {}
                ReadOutcome::Empty => break,
            }
        }

        Ok(messages)
    }

    fn read_single(&self) -> Result<ReadOutcome> {
        let channel = self.channel("receive")?;
        let handle = channel.handle();

        let (frame, timestamp) = match channel.format() {
            FrameFormat::Classic => {
                let mut record = [0u8; CLASSIC_FRAME_SIZE];
                let mut timestamp = [0u8; TIMESTAMP_SIZE];
                let status = self.driver.read(handle, &mut record, &mut timestamp);
                if self.check(status, None)?.contains(Status::QRCVEMPTY) {
                    return Ok(ReadOutcome::Empty);
                }
                (
                    NativeFrame::read_from(FrameFormat::Classic, &record)?,
                    NativeTimestamp::read_from(&timestamp).as_micros(),
                )
            }
            FrameFormat::Fd => {
                let mut record = [0u8; FD_FRAME_SIZE];
                let mut timestamp = 0u64;
                let status = self.driver.read_fd(handle, &mut record, &mut timestamp);
                if self.check(status, None)?.contains(Status::QRCVEMPTY) {
                    return Ok(ReadOutcome::Empty);
                }
                (NativeFrame::read_from(FrameFormat::Fd, &record)?, timestamp)
            }
        };

        if let Some(state) = status_frame_state(&frame) {
            debug!(channel = %handle, %state, "status frame");
        }

        if !self.accepts(frame.msg_type()) {
            trace!(channel = %handle, id = frame.id(), msg_type = frame.msg_type().bits(), "discarded");
            return Ok(ReadOutcome::Discarded);
        }

        trace!(channel = %handle, id = frame.id(), dlc = frame.dlc(), timestamp, "read");
        Ok(ReadOutcome::Frame(data_link::decode(
            &frame,
            timestamp,
            &self.config.channel,
        )))
    }

    /// Frames of a kind the channel did not opt in to are dropped.
    fn accepts(&self, msg_type: MessageType) -> bool {
        let config = &self.config;
        let opt_ins = [
            (MessageType::STATUS, config.recv_status_frames),
            (MessageType::ERRFRAME, config.recv_error_frames),
            (MessageType::RTR, config.recv_rtr_frames),
            (MessageType::ECHO, config.recv_echo_frames),
        ];

        opt_ins
            .iter()
            .all(|&(bit, enabled)| enabled || !msg_type.contains(bit))
    }

    fn wait_for_frames(&self, remaining: Option<Duration>) -> Result<()> {
        let channel = self.channel("receive")?;

        match &channel.receive_event {
            Some(event) => {
                event.wait(remaining)?;
            }
            None => {
                let poll = self.config.poll_interval();
                thread::sleep(remaining.map_or(poll, |remaining| remaining.min(poll)));
            }
        }
        Ok(())
    }
}
