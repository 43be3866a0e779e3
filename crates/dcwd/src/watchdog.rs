use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bytes::BytesMut;
use dcwd_proto::{
    decode_step, encode_frame, DecodeStep, DeviceMessage, CMD_PM_INFO_REQ, CMD_PM_SET_STATE,
};
use tracing::{debug, info, trace, warn};

use crate::config::WatchdogConfig;
use crate::health::HealthCheck;
use crate::telemetry::TelemetryLog;

const READ_CHUNK_SIZE: usize = 256;

/// Upper bound on buffered inbound bytes. Exceeding it discards the
/// buffer in full: a partial frame whose prefix is gone can never be
/// completed, so partial retention buys nothing.
const MAX_RECV_BUFFER: usize = 4096;

/// One open device-link session.
///
/// Single cooperative loop: drain inbound bytes, decode frames, poll
/// the health oracle on schedule, keep the relay commanded. All state
/// lives for exactly one session and dies with it.
pub struct Watchdog<L, H> {
    link: L,
    oracle: H,
    config: WatchdogConfig,
    telemetry: TelemetryLog,
    buf: BytesMut,
    /// When the most recent inbound byte was appended.
    last_receive: Instant,
    /// Next scheduled health poll; advances by a fixed period.
    next_poll: Instant,
    shutdown: Arc<AtomicBool>,
}

impl<L: Read + Write, H: HealthCheck> Watchdog<L, H> {
    pub fn new(link: L, oracle: H, config: WatchdogConfig, shutdown: Arc<AtomicBool>) -> Self {
        let now = Instant::now();
        Self {
            link,
            oracle,
            config,
            telemetry: TelemetryLog::new(),
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            last_receive: now,
            next_poll: now,
            shutdown,
        }
    }

    /// Run the session until shutdown (`Ok`) or a fatal link error
    /// (`Err`). Everything non-fatal is handled inside the loop, and
    /// uncertainty always resolves to "relay off".
    pub fn run(&mut self) -> io::Result<()> {
        self.send_frame(CMD_PM_INFO_REQ, &[])?;
        while !self.shutdown.load(Ordering::SeqCst) {
            self.tick()?;
            thread::sleep(self.config.tick);
        }
        info!("shutdown requested, ending session");
        Ok(())
    }

    fn tick(&mut self) -> io::Result<()> {
        self.drain_inbound()?;
        self.process_frames();

        if Instant::now() >= self.next_poll {
            // Advance from the scheduled instant, not from now.
            self.next_poll += self.config.poll_period;
            let safe = self.config.mock || self.oracle.is_safe();
            self.send_relay(safe)?;
        }
        Ok(())
    }

    /// Pull everything currently readable into the receive buffer.
    fn drain_inbound(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.link.read(&mut chunk) {
                // Zero bytes is "nothing yet", not an error.
                Ok(0) => return Ok(()),
                Ok(n) => {
                    self.append(&chunk[..n]);
                    if n < chunk.len() {
                        return Ok(());
                    }
                    // Full chunk: more may be pending.
                }
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(())
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    fn append(&mut self, bytes: &[u8]) {
        let now = Instant::now();
        if !self.buf.is_empty() && now.duration_since(self.last_receive) > self.config.receive_timeout
        {
            debug!(discarded = self.buf.len(), "stale partial frame, clearing buffer");
            self.buf.clear();
        }
        if self.buf.len() + bytes.len() > MAX_RECV_BUFFER {
            warn!(discarded = self.buf.len(), "receive buffer overflow, clearing buffer");
            self.buf.clear();
        }
        self.last_receive = now;
        self.buf.extend_from_slice(bytes);
    }

    /// Decode until the buffer stalls, dispatching frames in wire order.
    fn process_frames(&mut self) {
        loop {
            match decode_step(&mut self.buf) {
                DecodeStep::Incomplete => return,
                DecodeStep::Resync { dropped } => debug!(dropped, "resynchronizing"),
                DecodeStep::Frame(frame) => {
                    trace!(command = frame.command, len = frame.payload.len(), "> frame");
                    match DeviceMessage::decode(&frame) {
                        Ok(message) => self.telemetry.observe(&message),
                        // One bad frame does not disturb the stream.
                        Err(err) => warn!(command = frame.command, "rejecting frame: {err}"),
                    }
                }
            }
        }
    }

    fn send_relay(&mut self, on: bool) -> io::Result<()> {
        debug!(on, "relay command");
        self.send_frame(CMD_PM_SET_STATE, &[u8::from(on)])
    }

    fn send_frame(&mut self, command: u8, payload: &[u8]) -> io::Result<()> {
        let mut wire = BytesMut::new();
        encode_frame(command, payload, &mut wire).map_err(io::Error::other)?;
        trace!(command, len = payload.len(), "< frame");

        let mut offset = 0usize;
        while offset < wire.len() {
            match self.link.write(&wire[offset..]) {
                Ok(0) => return Err(io::Error::new(ErrorKind::WriteZero, "device link closed")),
                Ok(n) => offset += n,
                Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
        loop {
            match self.link.flush() {
                Ok(()) => return Ok(()),
                Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    continue
                }
                Err(err) => return Err(err),
            }
        }
    }
}
