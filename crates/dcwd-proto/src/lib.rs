//! Framed serial wire protocol for the DC-01 relay control unit.
//!
//! Every frame on the wire looks like:
//! - 2 magic bytes (0x37 0xE2) for stream synchronization
//! - 1 length byte counting the command byte plus the payload
//! - 1 command byte
//! - `length - 1` payload bytes
//!
//! Decoding is a step function over a caller-owned buffer: it either
//! yields a frame, asks for more bytes, or reports how many leading
//! junk bytes it discarded while hunting for the magic sequence.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{
    decode_step, encode_frame, DecodeStep, Frame, CMD_MP_BRTEST, CMD_MP_INFO, CMD_MP_STATE,
    CMD_PM_INFO_REQ, CMD_PM_PING, CMD_PM_SET_STATE, HEADER_SIZE, MAGIC, MAX_PAYLOAD,
};
pub use error::{ProtoError, Result};
pub use message::{DeviceMessage, DeviceMode, DeviceState, SelfTestState};
