use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};

/// Standard eISCP header size. Receivers may announce a larger header.
pub const HEADER_SIZE: usize = 16;

/// Magic bytes: "ISCP".
pub const MAGIC: [u8; 4] = *b"ISCP";

/// Protocol version byte carried in every header we emit.
pub const EISCP_VERSION: u8 = 0x01;

/// Terminator appended to every eISCP payload.
pub const EISCP_TERMINATOR: u8 = b'\r';

/// Default maximum eISCP payload accepted from a receiver: 64 KiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024;

/// Default maximum delimited message length: 1 KiB.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 1024;

/// Largest eISCP header accepted, extension bytes included.
pub const MAX_HEADER_SIZE: usize = 64;

/// Bytes needed to read both length fields of a header.
const LENGTH_FIELDS_END: usize = 12;

/// Lengths announced by an eISCP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EiscpHeader {
    /// Total header size, including any bytes beyond the standard 16.
    pub header_len: u32,
    /// Payload size, including the trailing terminator.
    pub payload_len: u32,
}

/// Encode an ISCP command into an eISCP frame.
///
/// Wire format:
/// ```text
/// ┌──────────┬────────────┬─────────────┬─────────┬──────────┬─────────┬──────┐
/// │ "ISCP"   │ Header len │ Payload len │ Version │ Reserved │ Command │ "\r" │
/// │ (4B)     │ (4B BE)=16 │ (4B BE)     │ (1B)    │ (3B)     │         │ (1B) │
/// └──────────┴────────────┴─────────────┴─────────┴──────────┴─────────┴──────┘
/// ```
pub fn encode_frame(command: &[u8], dst: &mut BytesMut) -> Result<()> {
    let max = u32::MAX as usize - 1;
    if command.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: command.len(),
            max,
        });
    }

    dst.reserve(HEADER_SIZE + command.len() + 1);
    dst.put_slice(&MAGIC);
    dst.put_u32(HEADER_SIZE as u32);
    dst.put_u32(command.len() as u32 + 1);
    dst.put_u8(EISCP_VERSION);
    dst.put_bytes(0, 3);
    dst.put_slice(command);
    dst.put_u8(EISCP_TERMINATOR);
    Ok(())
}

/// Read the length fields of an eISCP header.
///
/// Returns `None` if `src` does not start with the magic or is too short to
/// hold both length fields. Header bytes beyond the standard 16 are not
/// inspected; callers skip them using [`EiscpHeader::header_len`].
pub fn decode_header(src: &[u8]) -> Option<EiscpHeader> {
    if src.len() < MAGIC.len() || src[..MAGIC.len()] != MAGIC {
        debug!(received = ?src.get(..MAGIC.len()), "eISCP header has wrong magic");
        return None;
    }
    if src.len() < LENGTH_FIELDS_END {
        debug!(len = src.len(), "eISCP header truncated");
        return None;
    }

    let header_len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]);
    let payload_len = u32::from_be_bytes([src[8], src[9], src[10], src[11]]);

    Some(EiscpHeader {
        header_len,
        payload_len,
    })
}

/// Slice the command out of a complete eISCP datagram, dropping the final
/// terminator byte the payload length accounts for.
pub fn extract_message(datagram: &[u8]) -> Option<&[u8]> {
    let header = decode_header(datagram)?;
    let start = header.header_len as usize;
    let end = start.checked_add((header.payload_len as usize).saturating_sub(1))?;
    datagram.get(start..end)
}

/// Configuration for message assembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum eISCP payload size in bytes. Default: 64 KiB.
    pub max_payload_size: usize,
    /// Maximum delimited message length in bytes. Default: 1 KiB.
    pub max_message_len: usize,
    /// How long to wait for the next byte of a delimited message, or for the
    /// start of an eISCP frame. Default: 100 ms.
    pub poll_timeout: Duration,
    /// How long to wait for each byte of a declared-length eISCP read. Default: 1 s.
    pub byte_timeout: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            poll_timeout: Duration::from_millis(100),
            byte_timeout: Duration::from_secs(1),
        }
    }
}
