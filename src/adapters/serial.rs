//! Serial port byte source adapter
//!
//! This adapter implements the ByteSource trait on top of the `serialport`
//! crate. Framing is fixed at 8N1 without flow control.

use std::io::Read;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::config::SerialConfig;
use crate::ports::source::{classify_read, ByteSource, SourceError};

/// Serial port byte source
pub struct SerialSource {
    /// Open port handle, closed on drop
    port: Box<dyn SerialPort>,
    /// Name the port was opened with
    name: String,
}

impl SerialSource {
    /// Open and configure the port described by `config`
    ///
    /// Fails fast if the device is absent or busy.
    pub fn open(config: &SerialConfig) -> Result<Self, serialport::Error> {
        let name = device_path(&config.port);
        info!(port = %name, baud = config.baud_rate, "Opening serial port");

        let port = serialport::new(&name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout())
            .open()?;

        Ok(Self { port, name })
    }
}

impl ByteSource for SerialSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
        classify_read(self.port.read(buf))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        debug!(port = %self.name, "Serial port closed");
    }
}

/// Normalize a port name for the current platform
///
/// On Windows, COM ports >= 10 need the `\\.\COMxx` form; it works for
/// the low numbers too, so every bare `COMn` is rewritten.
pub fn device_path(port: &str) -> String {
    let port = port.trim();
    if cfg!(windows) && port.to_ascii_uppercase().starts_with("COM") {
        format!(r"\\.\{port}")
    } else {
        port.to_string()
    }
}

/// One line of `--list-ports` output per port
pub fn describe_ports(ports: &[serialport::SerialPortInfo]) -> Vec<String> {
    ports
        .iter()
        .map(|port| match &port.port_type {
            serialport::SerialPortType::UsbPort(usb) => {
                let mut line = format!(
                    "{} - USB (VID: 0x{:04x}, PID: 0x{:04x})",
                    port.port_name, usb.vid, usb.pid
                );
                if let Some(manufacturer) = &usb.manufacturer {
                    line.push_str(&format!(" {manufacturer}"));
                }
                if let Some(product) = &usb.product {
                    line.push_str(&format!(" {product}"));
                }
                line
            }
            serialport::SerialPortType::BluetoothPort => format!("{} - Bluetooth", port.port_name),
            serialport::SerialPortType::PciPort => format!("{} - PCI", port.port_name),
            serialport::SerialPortType::Unknown => format!("{} - Unknown", port.port_name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::{SerialPortInfo, SerialPortType};

    #[test]
    fn test_device_path() {
        assert_eq!(device_path(" /dev/ttyUSB0 "), "/dev/ttyUSB0");
        if cfg!(windows) {
            assert_eq!(device_path("COM12"), r"\\.\COM12");
        } else {
            assert_eq!(device_path("COM12"), "COM12");
        }
    }

    #[test]
    fn test_describe_ports() {
        let ports = vec![
            SerialPortInfo {
                port_name: "/dev/ttyS0".to_string(),
                port_type: SerialPortType::Unknown,
            },
            SerialPortInfo {
                port_name: "/dev/rfcomm0".to_string(),
                port_type: SerialPortType::BluetoothPort,
            },
        ];
        assert_eq!(
            describe_ports(&ports),
            vec![
                "/dev/ttyS0 - Unknown".to_string(),
                "/dev/rfcomm0 - Bluetooth".to_string(),
            ]
        );
    }
}
