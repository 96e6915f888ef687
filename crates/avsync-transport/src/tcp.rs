use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteLink;

/// Default bound on establishing a TCP connection (and on each blocked write).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest read timeout the OS accepts; a zero timeout means "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// TCP link to a receiver (or to a serial-over-IP bridge in front of one).
///
/// The socket is created on [`connect`](ByteLink::connect) and dropped on
/// [`disconnect`](ByteLink::disconnect); the host and port never change.
pub struct TcpLink {
    host: String,
    port: u16,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpLink {
    /// Create a closed link for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream: None,
        }
    }

    /// Override how long a connect attempt may take.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Receiver host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Receiver TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream> {
        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }

    fn open_stream(&self) -> Result<TcpStream> {
        let endpoint = self.describe();
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.clone(),
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            endpoint,
            source: last_err.unwrap_or_else(|| {
                std::io::Error::new(ErrorKind::AddrNotAvailable, "host resolved to no addresses")
            }),
        })
    }
}

impl ByteLink for TcpLink {
    fn connect(&mut self) -> Result<()> {
        if let Some(stale) = self.stream.take() {
            let _ = stale.shutdown(Shutdown::Both);
        }

        let stream = self.open_stream()?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(self.connect_timeout))?;
        self.stream = Some(stream);

        info!(endpoint = %self.describe(), "connected to receiver");
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!(endpoint = %self.describe(), "disconnected from receiver");
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn has_data_ready(&mut self, timeout: Duration) -> Result<bool> {
        let stream = self.stream_mut()?;
        stream.set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;

        let mut probe = [0u8; 1];
        loop {
            match stream.peek(&mut probe) {
                // Zero bytes is EOF: readable, and read_byte reports the close.
                Ok(_) => return Ok(true),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(false)
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let stream = self.stream_mut()?;
        let mut byte = [0u8; 1];
        loop {
            match stream.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for TcpLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLink")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("open", &self.stream.is_some())
            .finish()
    }
}
