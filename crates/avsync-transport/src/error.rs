/// Errors that can occur on a receiver link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open a TCP connection to the receiver.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    /// Failed to open the serial device.
    #[error("failed to open serial device {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    /// The serial driver reported an error.
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on an open link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link is not open.
    #[error("link is not connected")]
    NotConnected,

    /// The peer closed the link.
    #[error("link closed by peer")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
