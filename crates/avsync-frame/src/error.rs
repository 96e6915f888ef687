/// Errors that can occur while framing or assembling messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The eISCP header does not start with `ISCP`.
    #[error("invalid eISCP magic (expected \"ISCP\")")]
    InvalidMagic,

    /// The declared eISCP header length exceeds the supported maximum.
    #[error("eISCP header too large ({size} bytes, max {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// The declared eISCP payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A delimited message grew past the configured maximum without a terminator.
    #[error("message exceeds {max} bytes without a terminator")]
    MessageTooLong { max: usize },

    /// A declared-length read stalled before all bytes arrived.
    #[error("timed out after {received} of {expected} bytes")]
    Timeout { expected: usize, received: usize },

    /// The peer closed the stream mid-message.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,

    /// The underlying link failed.
    #[error("link error: {0}")]
    Transport(#[from] avsync_transport::TransportError),
}

impl FrameError {
    /// Whether the link itself is unusable and must be reconnected.
    ///
    /// Everything else only spoils the message in flight.
    pub fn is_link_failure(&self) -> bool {
        matches!(self, FrameError::ConnectionClosed | FrameError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
