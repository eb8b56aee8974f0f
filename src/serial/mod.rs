//! # Serial Communication Module
//!
//! Handles the UART link to the flight controller.
//!
//! This module handles:
//! - Opening a serial device at a CRSF baud rate (8N1, no flow control)
//! - Non-blocking single-byte reads for the receive tick
//! - Writing encoded frames

pub mod transport;

pub use transport::Transport;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::{CrsfBridgeError, Result};
use tracing::{debug, info, warn};

/// Default CRSF baud rate
pub const CRSF_BAUD_RATE: u32 = 420_000;

/// Baud rates accepted by CRSF receivers and flight controllers
pub const SUPPORTED_BAUD_RATES: &[u32] = &[115_200, 400_000, 420_000, 921_600, 1_870_000, 3_750_000];

/// UART transport backed by a platform serial device
pub struct SerialTransport {
    /// Serial port handle
    port: Box<dyn tokio_serial::SerialPort>,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Open a serial device
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyAMA0")
    /// * `baud_rate` - Line rate, normally [`CRSF_BAUD_RATE`]
    ///
    /// # Errors
    ///
    /// Returns `Serial` if the device cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_bridge::serial::{SerialTransport, CRSF_BAUD_RATE};
    ///
    /// let transport = SerialTransport::open("/dev/ttyAMA0", CRSF_BAUD_RATE)?;
    /// println!("Connected to: {}", transport.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::ZERO)
            .open()
            .map_err(|e| CrsfBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl Transport for SerialTransport {
    fn try_read_byte(&mut self) -> Result<Option<u8>> {
        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| CrsfBridgeError::Serial(format!("{}: {}", self.device_path, e)))?;
        if available == 0 {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(CrsfBridgeError::Io(e)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.port
            .write_all(data)
            .map_err(|e| CrsfBridgeError::Serial(format!("Failed to write frame: {}", e)))?;
        Ok(data.len())
    }

    fn name(&self) -> &str {
        &self.device_path
    }
}

/// Open a transport, logging and returning `None` when it is unavailable
///
/// An empty path means the port is not configured.
pub fn open_optional(path: &str, baud_rate: u32) -> Option<Box<dyn Transport>> {
    if path.is_empty() {
        debug!("Serial port not configured, skipping");
        return None;
    }

    match SerialTransport::open(path, baud_rate) {
        Ok(transport) => {
            info!("Opened serial port {} at {} baud", path, baud_rate);
            Some(Box::new(transport))
        }
        Err(e) => {
            warn!("Transport unavailable: {}", e);
            None
        }
    }
}
