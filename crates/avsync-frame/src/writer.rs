use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::encode_frame;
use crate::error::Result;

/// Terminator appended to outbound delimited commands.
const OUTBOUND_TERMINATOR: u8 = b'\r';

/// How messages are delimited on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Each message wrapped in an eISCP header.
    Eiscp,
    /// Raw ISCP: `!` starts a message, CR/LF/EOF ends it.
    Delimited,
}

impl Framing {
    /// Lowercase label used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            Framing::Eiscp => "eiscp",
            Framing::Delimited => "delimited",
        }
    }
}

/// Shape a command for the wire.
///
/// eISCP links get a full frame; delimited links get the command followed by `\r`.
pub fn encode_outbound(framing: Framing, command: &[u8]) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    match framing {
        Framing::Eiscp => encode_frame(command, &mut dst)?,
        Framing::Delimited => {
            dst.reserve(command.len() + 1);
            dst.put_slice(command);
            dst.put_u8(OUTBOUND_TERMINATOR);
        }
    }
    Ok(dst.freeze())
}
