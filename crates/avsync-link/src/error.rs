use std::path::PathBuf;

use avsync_frame::FrameError;
use avsync_transport::TransportError;

/// Errors that can occur in connection and relay operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A send failed, and so did the single retry after reconnecting.
    #[error("send to {endpoint} failed after reconnect: {source}")]
    SendFailed {
        endpoint: String,
        source: TransportError,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors that can occur while loading relay configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or is missing required keys.
    #[error("invalid configuration json: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur while parsing an endpoint string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointParseError {
    #[error("unknown endpoint scheme in {0:?} (expected eiscp://, tcp:// or serial:)")]
    UnknownScheme(String),

    #[error("missing host in {0:?}")]
    MissingHost(String),

    #[error("missing port in {0:?}")]
    MissingPort(String),

    #[error("invalid port in {0:?}")]
    InvalidPort(String),

    #[error("missing serial device in {0:?}")]
    MissingDevice(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
