use dcwd_proto::{DeviceMessage, DeviceState};
use tracing::{debug, info, warn};

/// Firmware versions this watchdog is validated against.
pub const OK_VERSIONS: &[&str] = &["1.0"];

/// Turns decoded device messages into log events.
///
/// Keeps the last-seen firmware version so the compatibility warning
/// fires once per learned version, not on every INFO frame.
#[derive(Debug, Default)]
pub struct TelemetryLog {
    fw_version: Option<String>,
}

impl TelemetryLog {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)] // test observability hook
    pub fn firmware_version(&self) -> Option<&str> {
        self.fw_version.as_deref()
    }

    pub fn observe(&mut self, message: &DeviceMessage) {
        match message {
            DeviceMessage::Info { major, minor } => {
                let version = format!("{major}.{minor}");
                info!("DC-01 FW v{version}");
                if self.fw_version.as_deref() != Some(version.as_str())
                    && !OK_VERSIONS.contains(&version.as_str())
                {
                    warn!("DC-01 FW version {version} is not supported (outdated version?)");
                }
                self.fw_version = Some(version);
            }
            DeviceMessage::State(state) => observe_state(state),
            DeviceMessage::SelfTest { state, step, error } => {
                info!("BRTest state: {state}, step={step}, error={error}");
            }
            DeviceMessage::Unknown { command, payload } => {
                debug!(command, len = payload.len(), "ignoring unrecognized frame");
            }
        }
    }
}

fn observe_state(state: &DeviceState) {
    if state.is_healthy() {
        info!(
            mode = ?state.mode,
            dcc_connected = state.dcc_connected,
            dcc_seen = state.dcc_seen,
            "device state"
        );
    } else {
        warn!(
            mode = ?state.mode,
            dcc_connected = state.dcc_connected,
            dcc_seen = state.dcc_seen,
            failure_code = state.failure_code,
            warnings = state.warnings,
            "device state"
        );
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use dcwd_proto::{DeviceMode, SelfTestState};

    use super::*;

    #[test]
    fn remembers_firmware_version() {
        let mut telemetry = TelemetryLog::new();
        assert_eq!(telemetry.firmware_version(), None);

        telemetry.observe(&DeviceMessage::Info { major: 1, minor: 0 });
        assert_eq!(telemetry.firmware_version(), Some("1.0"));

        telemetry.observe(&DeviceMessage::Info { major: 0, minor: 9 });
        assert_eq!(telemetry.firmware_version(), Some("0.9"));
    }

    #[test]
    fn observes_every_message_kind() {
        let mut telemetry = TelemetryLog::new();
        telemetry.observe(&DeviceMessage::State(DeviceState {
            mode: DeviceMode::Failure,
            dcc_connected: false,
            dcc_seen: true,
            failure_code: 3,
            warnings: 0,
        }));
        telemetry.observe(&DeviceMessage::SelfTest {
            state: SelfTestState::InProgress,
            step: 2,
            error: 0,
        });
        telemetry.observe(&DeviceMessage::Unknown {
            command: 0x7F,
            payload: Bytes::from_static(&[0x00]),
        });
    }
}
