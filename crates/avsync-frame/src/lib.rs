//! eISCP framing and ISCP message assembly.
//!
//! Receivers speak ISCP (`!<zone><command><parameter>`) in one of two shapes:
//! - eISCP over TCP: each command wrapped in a 16-byte `ISCP` header
//! - raw ISCP over TCP or RS-232: commands delimited by `\r`, `\n` or EOF (0x1A)
//!
//! [`MessageReader`] turns either byte stream into discrete [`Message`]s and
//! [`encode_outbound`] shapes a command for the wire.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_header, encode_frame, extract_message, EiscpHeader, FrameConfig, DEFAULT_MAX_MESSAGE_LEN,
    DEFAULT_MAX_PAYLOAD, HEADER_SIZE, MAGIC, MAX_HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use message::{Message, MAIN_ZONE_PREFIX, POWER_PREFIX, POWER_QUERY, START_MARKER};
pub use reader::MessageReader;
pub use writer::{encode_outbound, Framing};
