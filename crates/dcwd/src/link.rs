use std::time::Duration;

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use tracing::debug;

/// USB product string the DC-01 reports.
pub const DEVICE_PRODUCT: &str = "DC-01";
pub const BAUD_RATE: u32 = 115_200;

/// Reads return within this window whether or not bytes arrived, which
/// makes the blocking serial API behave like a non-blocking one.
const READ_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("no DC-01 found")]
    NoDevice,

    #[error("multiple DC-01s found ({0} candidates)")]
    AmbiguousDevice(usize),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Enumerate serial endpoints and pick the single attached DC-01.
///
/// Zero or more than one match is an error; with several units
/// attached the operator must pin one explicitly.
pub fn discover() -> Result<String, LinkError> {
    let mut candidates: Vec<String> = serialport::available_ports()?
        .into_iter()
        .filter(|port| product_name(port) == Some(DEVICE_PRODUCT))
        .map(|port| port.port_name)
        .collect();
    debug!(?candidates, "device discovery");

    match candidates.len() {
        0 => Err(LinkError::NoDevice),
        1 => Ok(candidates.remove(0)),
        n => Err(LinkError::AmbiguousDevice(n)),
    }
}

fn product_name(port: &SerialPortInfo) -> Option<&str> {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => usb.product.as_deref(),
        _ => None,
    }
}

/// Open the device link for one session.
pub fn open(path: &str) -> Result<Box<dyn SerialPort>, LinkError> {
    let port = serialport::new(path, BAUD_RATE)
        .timeout(READ_TIMEOUT)
        .open()?;
    Ok(port)
}
