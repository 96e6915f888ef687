//! Receiver connection lifecycle and power-state relay.
//!
//! This is the "just works" layer. Describe receivers as endpoints, wrap each
//! in a self-healing [`Connection`], and let a [`Relay`] keep the secondaries'
//! power state in step with the primary.

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod relay;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{LinkConfig, RelayConfig};
pub use connection::{Connection, ConnectionState, MessageHandler, PollOutcome};
pub use endpoint::{ReceiverEndpoint, TransportKind, EISCP_PORT};
pub use error::{ConfigError, EndpointParseError, LinkError, Result};
pub use relay::{ForwardReport, Relay, DEFAULT_PROBE_INTERVAL};
pub use transport::{Link, Transport};
