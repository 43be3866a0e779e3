use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{ProtoError, Result};

/// Magic bytes opening every frame, both directions.
pub const MAGIC: [u8; 2] = [0x37, 0xE2];

/// Frame header: magic (2) + length (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Maximum payload size. The length byte counts command + payload.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - 1;

// Host -> device commands.
pub const CMD_PM_INFO_REQ: u8 = 0x10;
pub const CMD_PM_SET_STATE: u8 = 0x11;
pub const CMD_PM_PING: u8 = 0x02;

// Device -> host commands.
pub const CMD_MP_INFO: u8 = 0x10;
pub const CMD_MP_STATE: u8 = 0x11;
pub const CMD_MP_BRTEST: u8 = 0x12;

/// One complete frame lifted off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The command byte.
    pub command: u8,
    /// The payload following the command byte.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(command: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + command + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + 1 + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬─────────┬─────────┬──────────────────┐
/// │ Magic (2B) │ Length  │ Command │ Payload           │
/// │ 0x37 0xE2  │ (1B)    │ (1B)    │ (Length-1 bytes)  │
/// └────────────┴─────────┴─────────┴──────────────────┘
/// ```
pub fn encode_frame(command: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ProtoError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + 1 + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8((payload.len() + 1) as u8);
    dst.put_u8(command);
    dst.put_slice(payload);
    Ok(())
}

/// Outcome of one decode step over the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStep {
    /// Not enough bytes for a complete frame; the buffer is untouched.
    Incomplete,
    /// Leading bytes did not line up with the magic sequence and were
    /// discarded. Call again to continue at the new buffer head.
    Resync { dropped: usize },
    /// One complete frame was consumed from the buffer.
    Frame(Frame),
}

/// Run one decode step against the buffer.
///
/// Resynchronization always wins over length arithmetic: any leading
/// byte that does not open a magic sequence is dropped before a length
/// byte is even looked at. A partial frame is never consumed; the
/// buffer stays as-is until its declared length worth of bytes has
/// arrived.
pub fn decode_step(src: &mut BytesMut) -> DecodeStep {
    let mut dropped = 0usize;
    while src.len() >= MAGIC.len() && src[..MAGIC.len()] != MAGIC {
        src.advance(1);
        dropped += 1;
    }
    if dropped > 0 {
        return DecodeStep::Resync { dropped };
    }

    if src.len() < HEADER_SIZE {
        return DecodeStep::Incomplete;
    }

    let length = src[2] as usize;
    if length == 0 {
        // A zero declared length has no command byte; discard the
        // header like any other line noise.
        src.advance(HEADER_SIZE);
        return DecodeStep::Resync {
            dropped: HEADER_SIZE,
        };
    }
    if src.len() < HEADER_SIZE + length {
        return DecodeStep::Incomplete;
    }

    src.advance(HEADER_SIZE);
    let command = src.get_u8();
    let payload = src.split_to(length - 1).freeze();

    DecodeStep::Frame(Frame { command, payload })
}
