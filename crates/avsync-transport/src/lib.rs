//! Byte-level links to AV receivers.
//!
//! Provides a unified interface over the physical media a receiver can be
//! reached on:
//! - TCP sockets (eISCP and raw ISCP-over-TCP both ride on [`TcpLink`])
//! - Serial ports ([`SerialLink`])
//!
//! This is the lowest layer of avsync. Framing and connection lifecycle build
//! on top of the [`ByteLink`] capability trait provided here.

pub mod error;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{SerialLink, SERIAL_BAUD_RATE, SERIAL_TIMEOUT};
pub use tcp::{TcpLink, DEFAULT_CONNECT_TIMEOUT};
pub use traits::ByteLink;
