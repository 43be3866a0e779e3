use std::fmt;

use bytes::Bytes;

use crate::codec::{Frame, CMD_MP_BRTEST, CMD_MP_INFO, CMD_MP_STATE};
use crate::error::{ProtoError, Result};

/// Operating mode reported in the high nibble of a STATE frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    Initializing,
    NormalOp,
    Override,
    Failure,
}

impl TryFrom<u8> for DeviceMode {
    type Error = ProtoError;

    fn try_from(index: u8) -> Result<Self> {
        match index {
            0 => Ok(DeviceMode::Initializing),
            1 => Ok(DeviceMode::NormalOp),
            2 => Ok(DeviceMode::Override),
            3 => Ok(DeviceMode::Failure),
            other => Err(ProtoError::UnknownMode(other)),
        }
    }
}

/// Self-test progress reported in a BRTEST frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestState {
    NotRun,
    InProgress,
    Succeeded,
    Failed,
    InterruptedNoDcc,
    Unknown(u8),
}

impl From<u8> for SelfTestState {
    fn from(value: u8) -> Self {
        match value {
            0 => SelfTestState::NotRun,
            1 => SelfTestState::InProgress,
            2 => SelfTestState::Succeeded,
            3 => SelfTestState::Failed,
            4 => SelfTestState::InterruptedNoDcc,
            other => SelfTestState::Unknown(other),
        }
    }
}

impl fmt::Display for SelfTestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfTestState::NotRun => write!(f, "not yet run"),
            SelfTestState::InProgress => write!(f, "in progress"),
            SelfTestState::Succeeded => write!(f, "successfully completed"),
            SelfTestState::Failed => write!(f, "failed"),
            SelfTestState::InterruptedNoDcc => write!(f, "interrupted due to DCC absence"),
            SelfTestState::Unknown(value) => write!(f, "unknown ({value})"),
        }
    }
}

/// Decoded STATE telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub mode: DeviceMode,
    /// DCC signal is present right now.
    pub dcc_connected: bool,
    /// DCC signal has been seen at least once since power-up.
    pub dcc_seen: bool,
    pub failure_code: u8,
    pub warnings: u8,
}

impl DeviceState {
    /// Nothing to worry about: normal operation, no failure, no warnings.
    pub fn is_healthy(&self) -> bool {
        self.mode == DeviceMode::NormalOp && self.failure_code == 0 && self.warnings == 0
    }
}

/// Semantic view of one device -> host frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Firmware version report.
    Info { major: u8, minor: u8 },
    /// Periodic status telemetry.
    State(DeviceState),
    /// Self-test progress report.
    SelfTest {
        state: SelfTestState,
        step: u8,
        error: u8,
    },
    /// Anything this build does not understand, including frames whose
    /// payload is too short for their command.
    Unknown { command: u8, payload: Bytes },
}

impl DeviceMessage {
    /// Interpret a decoded frame.
    ///
    /// Unknown commands and undersized payloads become
    /// [`DeviceMessage::Unknown`]; only an out-of-range field inside an
    /// otherwise well-formed frame is an error.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let payload = &frame.payload;
        match frame.command {
            CMD_MP_INFO if payload.len() >= 2 => Ok(DeviceMessage::Info {
                major: payload[0],
                minor: payload[1],
            }),
            CMD_MP_STATE if payload.len() >= 3 => {
                let mode = DeviceMode::try_from(payload[0] >> 4)?;
                Ok(DeviceMessage::State(DeviceState {
                    mode,
                    dcc_connected: payload[0] & 0x01 != 0,
                    dcc_seen: payload[0] & 0x02 != 0,
                    failure_code: payload[1],
                    warnings: payload[2],
                }))
            }
            CMD_MP_BRTEST if payload.len() >= 3 => Ok(DeviceMessage::SelfTest {
                state: SelfTestState::from(payload[0]),
                step: payload[1],
                error: payload[2],
            }),
            command => Ok(DeviceMessage::Unknown {
                command,
                payload: payload.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(command: u8, payload: &[u8]) -> Result<DeviceMessage> {
        DeviceMessage::decode(&Frame::new(command, payload.to_vec()))
    }

    #[test]
    fn info_frame() {
        let message = decode(CMD_MP_INFO, &[0x01, 0x00]).unwrap();
        assert_eq!(message, DeviceMessage::Info { major: 1, minor: 0 });
    }

    #[test]
    fn state_frame_healthy() {
        // mode=NormalOp (high nibble 1), no DCC flags, no failure, no warnings.
        let message = decode(CMD_MP_STATE, &[0x10, 0x00, 0x00]).unwrap();
        let DeviceMessage::State(state) = message else {
            panic!("expected state, got {message:?}");
        };
        assert_eq!(state.mode, DeviceMode::NormalOp);
        assert!(!state.dcc_connected);
        assert!(!state.dcc_seen);
        assert_eq!(state.failure_code, 0);
        assert_eq!(state.warnings, 0);
        assert!(state.is_healthy());
    }

    #[test]
    fn state_frame_flags_and_severity() {
        let message = decode(CMD_MP_STATE, &[0x13, 0x05, 0x02]).unwrap();
        let DeviceMessage::State(state) = message else {
            panic!("expected state, got {message:?}");
        };
        assert_eq!(state.mode, DeviceMode::NormalOp);
        assert!(state.dcc_connected);
        assert!(state.dcc_seen);
        assert_eq!(state.failure_code, 5);
        assert_eq!(state.warnings, 2);
        assert!(!state.is_healthy());

        // Any mode other than NormalOp is unhealthy even with clean codes.
        let message = decode(CMD_MP_STATE, &[0x30, 0x00, 0x00]).unwrap();
        let DeviceMessage::State(state) = message else {
            panic!("expected state, got {message:?}");
        };
        assert_eq!(state.mode, DeviceMode::Failure);
        assert!(!state.is_healthy());
    }

    #[test]
    fn state_frame_unknown_mode_is_an_error() {
        let err = decode(CMD_MP_STATE, &[0x40, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownMode(4)));
    }

    #[test]
    fn brtest_frame_states() {
        let message = decode(CMD_MP_BRTEST, &[0x02, 0x07, 0x00]).unwrap();
        assert_eq!(
            message,
            DeviceMessage::SelfTest {
                state: SelfTestState::Succeeded,
                step: 7,
                error: 0,
            }
        );

        let message = decode(CMD_MP_BRTEST, &[0x09, 0x00, 0x01]).unwrap();
        assert_eq!(
            message,
            DeviceMessage::SelfTest {
                state: SelfTestState::Unknown(9),
                step: 0,
                error: 1,
            }
        );
    }

    #[test]
    fn undersized_payloads_are_unknown() {
        for (command, payload) in [
            (CMD_MP_INFO, &[0x01][..]),
            (CMD_MP_STATE, &[0x10, 0x00][..]),
            (CMD_MP_BRTEST, &[0x01][..]),
        ] {
            let message = decode(command, payload).unwrap();
            assert!(
                matches!(message, DeviceMessage::Unknown { command: c, .. } if c == command),
                "command {command:#04x}"
            );
        }
    }

    #[test]
    fn unrecognized_command_is_unknown() {
        let message = decode(0x7F, &[0xAA, 0xBB]).unwrap();
        assert_eq!(
            message,
            DeviceMessage::Unknown {
                command: 0x7F,
                payload: Bytes::from_static(&[0xAA, 0xBB]),
            }
        );
    }

    #[test]
    fn self_test_state_display() {
        assert_eq!(SelfTestState::NotRun.to_string(), "not yet run");
        assert_eq!(
            SelfTestState::InterruptedNoDcc.to_string(),
            "interrupted due to DCC absence"
        );
        assert_eq!(SelfTestState::Unknown(9).to_string(), "unknown (9)");
    }
}
