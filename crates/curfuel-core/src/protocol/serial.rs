//! Serial port handling
//!
//! Provides low-level serial port access to the level sender.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;

use super::{ChannelError, Connector, SerialTransport, Transport};
use crate::config::SerialConfig;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, product) = match info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                (Some(usb_info.vid), Some(usb_info.pid), usb_info.product)
            }
            _ => (None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            product,
        }
    }
}

/// Sort key putting ttyACM* first (the sender's usual CDC device), then
/// ttyUSB*, then everything else; numeric order within each group
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List candidate sender devices, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // udev sometimes lags behind the device nodes
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone()).or_insert_with(|| PortInfo {
                        name: full,
                        vid: None,
                        pid: None,
                        product: None,
                    });
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Map a serialport failure onto retryable vs fatal
fn classify(err: serialport::Error) -> ChannelError {
    match err.kind {
        serialport::ErrorKind::InvalidInput => ChannelError::InvalidSettings(err.to_string()),
        _ => ChannelError::Unavailable(err.to_string()),
    }
}

/// Open a serial port for the sender
pub fn open_port(settings: &SerialConfig) -> Result<Box<dyn SerialPort>, ChannelError> {
    serialport::new(&settings.device_path, settings.baud_rate)
        .timeout(settings.read_timeout)
        .open()
        .map_err(classify)
}

/// Configure a serial port for the sender: 8N1, no flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ChannelError> {
    port.set_data_bits(serialport::DataBits::Eight).map_err(classify)?;
    port.set_parity(serialport::Parity::None).map_err(classify)?;
    port.set_stop_bits(serialport::StopBits::One).map_err(classify)?;
    port.set_flow_control(serialport::FlowControl::None).map_err(classify)?;

    // Keep DTR asserted so the AVR bootloader is not re-triggered mid-session
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!("failed to set DTR high: {} (continuing)", e);
    }

    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ChannelError> {
    port.clear(serialport::ClearBuffer::All).map_err(classify)
}

/// Connector backed by a real serial device
#[derive(Debug, Default)]
pub struct SerialConnector;

impl SerialConnector {
    /// Create a serial connector
    pub fn new() -> Self {
        Self
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self, settings: &SerialConfig) -> Result<Box<dyn Transport>, ChannelError> {
        let mut port = open_port(settings)?;
        configure_port(port.as_mut())?;
        // drop whatever the sender printed while we were away
        clear_buffers(port.as_mut())?;
        Ok(Box::new(SerialTransport::new(port)))
    }
}
