use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::ByteLink;

/// Baud rate of the ISCP RS-232 port.
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// Read/write timeout applied to the opened device.
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial link to a receiver's RS-232 control port.
pub struct SerialLink {
    device: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    /// Create a closed link for a device path such as `/dev/ttyUSB0` or `COM3`.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            port: None,
        }
    }

    /// Device path this link opens.
    pub fn device(&self) -> &str {
        &self.device
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::NotConnected)
    }

    fn bytes_waiting(&mut self) -> Result<bool> {
        Ok(self.port_mut()?.bytes_to_read()? > 0)
    }
}

impl ByteLink for SerialLink {
    fn connect(&mut self) -> Result<()> {
        self.port = None;

        let port = serialport::new(&self.device, SERIAL_BAUD_RATE)
            .timeout(SERIAL_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                device: self.device.clone(),
                source,
            })?;
        self.port = Some(port);

        info!(endpoint = %self.describe(), "connected to receiver");
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            info!(endpoint = %self.describe(), "disconnected from receiver");
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// The driver only exposes a non-blocking input count, so an empty buffer
    /// is re-checked once after sleeping for `timeout`.
    fn has_data_ready(&mut self, timeout: Duration) -> Result<bool> {
        if self.bytes_waiting()? {
            return Ok(true);
        }
        std::thread::sleep(timeout);
        self.bytes_waiting()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let port = self.port_mut()?;
        let mut byte = [0u8; 1];
        loop {
            match port.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.device.clone()
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device", &self.device)
            .field("open", &self.port.is_some())
            .finish()
    }
}
