//! Serial port infrastructure backed by the `serialport` crate.
//!
//! [`SystemPorts`] implements [`PortProvider`] for the real machine: it lists
//! ports with their USB product / manufacturer strings (used for
//! auto-detection) and opens them as `Box<dyn SerialPort>` byte channels.

use std::time::Duration;

use serialport::{SerialPort, SerialPortType};
use tracing::debug;

use crate::application::discover_port::{PortError, PortInfo, PortProvider};

pub mod mock;

/// The host's serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl SystemPorts {
    pub fn new() -> Self {
        Self
    }
}

impl PortProvider for SystemPorts {
    type Channel = Box<dyn SerialPort>;

    fn list_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        let ports = serialport::available_ports().map_err(port_error)?;
        Ok(ports
            .into_iter()
            .map(|p| {
                let description = describe_port_type(&p.port_type);
                debug!("found serial port {} ({description})", p.port_name);
                PortInfo::new(p.port_name, description)
            })
            .collect())
    }

    fn open(&self, port: &str, baud: u32, timeout: Duration) -> Result<Self::Channel, PortError> {
        serialport::new(port, baud)
            .timeout(timeout)
            .open()
            .map_err(port_error)
    }
}

fn port_error(e: serialport::Error) -> PortError {
    let error = PortError::new(e.to_string());
    match e.kind() {
        serialport::ErrorKind::Io(kind) => error.with_io_kind(kind),
        _ => error,
    }
}

/// Builds the description matched against the detection markers.
fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut parts: Vec<String> = Vec::new();
            if let Some(ref product) = usb.product {
                parts.push(product.clone());
            }
            if let Some(ref manufacturer) = usb.manufacturer {
                parts.push(manufacturer.clone());
            }
            parts.push(format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid));
            parts.join(" - ")
        }
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::Unknown => "Unknown serial port".to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
