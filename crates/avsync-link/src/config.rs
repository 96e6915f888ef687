use std::path::Path;
use std::time::Duration;

use avsync_frame::{FrameConfig, DEFAULT_MAX_MESSAGE_LEN, DEFAULT_MAX_PAYLOAD};
use avsync_transport::DEFAULT_CONNECT_TIMEOUT;
use serde::{Deserialize, Serialize};

use crate::endpoint::ReceiverEndpoint;
use crate::error::ConfigError;

/// Which receiver leads and which ones follow its power state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub primary: ReceiverEndpoint,
    pub secondaries: Vec<ReceiverEndpoint>,
}

impl RelayConfig {
    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse and validate JSON configuration text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every endpoint for values no link can use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.primary
            .validate()
            .map_err(|err| prefix_error("primary", err))?;
        for (index, endpoint) in self.secondaries.iter().enumerate() {
            endpoint
                .validate()
                .map_err(|err| prefix_error(&format!("secondaries[{index}]"), err))?;
        }
        Ok(())
    }
}

fn prefix_error(location: &str, err: ConfigError) -> ConfigError {
    match err {
        ConfigError::Invalid(message) => ConfigError::Invalid(format!("{location}: {message}")),
        other => other,
    }
}

/// Runtime timings and limits shared by every connection.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Bound on each wait for inbound data while idle. Default: 100 ms.
    pub poll_timeout: Duration,
    /// Bound on each byte of a declared-length eISCP read. Default: 1 s.
    pub byte_timeout: Duration,
    /// Pause after a failed connect and before a send retry. Default: 1 s.
    pub reconnect_backoff: Duration,
    /// Bound on establishing a TCP connection. Default: 5 s.
    pub connect_timeout: Duration,
    /// Maximum eISCP payload accepted. Default: 64 KiB.
    pub max_payload_size: usize,
    /// Maximum delimited message length. Default: 1 KiB.
    pub max_message_len: usize,
}

impl LinkConfig {
    /// The subset of this configuration message assembly needs.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            max_message_len: self.max_message_len,
            poll_timeout: self.poll_timeout,
            byte_timeout: self.byte_timeout,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_millis(100),
            byte_timeout: Duration::from_secs(1),
            reconnect_backoff: Duration::from_secs(1),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}
