use avsync_transport::ByteLink;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

use crate::codec::{decode_header, FrameConfig, HEADER_SIZE, MAGIC, MAX_HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::message::{is_terminator, trim_terminators, Message, START_MARKER};
use crate::writer::Framing;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Assembles complete messages from a [`ByteLink`].
///
/// Every wait is bounded by [`FrameConfig`] timeouts, so a call returns
/// `Ok(None)` on an idle link instead of blocking.
pub struct MessageReader {
    buf: BytesMut,
    config: FrameConfig,
}

impl MessageReader {
    /// Create a reader with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Attempt to read one message.
    ///
    /// Returns `Ok(None)` when nothing complete arrived: the link was idle, a
    /// delimited message stayed unterminated, or an eISCP message was not for
    /// the main zone. Errors for which [`FrameError::is_link_failure`] is
    /// false only spoil the message in flight.
    pub fn read_message<L: ByteLink + ?Sized>(
        &mut self,
        link: &mut L,
        framing: Framing,
    ) -> Result<Option<Message>> {
        match framing {
            Framing::Eiscp => self.read_eiscp(link),
            Framing::Delimited => self.read_delimited(link),
        }
    }

    fn read_delimited<L: ByteLink + ?Sized>(&mut self, link: &mut L) -> Result<Option<Message>> {
        self.buf.clear();
        let mut started = false;
        let mut terminated = false;

        while link.has_data_ready(self.config.poll_timeout)? {
            let byte = link.read_byte()?.ok_or(FrameError::ConnectionClosed)?;

            if is_terminator(byte) {
                if started {
                    terminated = true;
                    break;
                }
                continue;
            }
            if byte == START_MARKER {
                started = true;
            }
            if !started {
                continue;
            }
            if self.buf.len() >= self.config.max_message_len {
                self.buf.clear();
                return Err(FrameError::MessageTooLong {
                    max: self.config.max_message_len,
                });
            }
            self.buf.put_u8(byte);
        }

        if terminated {
            let message = Message::new(self.buf.split().freeze());
            debug!(%message, "received message");
            return Ok(Some(message));
        }

        if !self.buf.is_empty() {
            warn!(
                received = %self.buf.escape_ascii(),
                "discarding unterminated message"
            );
            self.buf.clear();
        }
        Ok(None)
    }

    fn read_eiscp<L: ByteLink + ?Sized>(&mut self, link: &mut L) -> Result<Option<Message>> {
        // Resynchronize on the first magic byte; anything before it is noise.
        let mut synced = false;
        while link.has_data_ready(self.config.poll_timeout)? {
            match link.read_byte()? {
                Some(byte) if byte == MAGIC[0] => {
                    synced = true;
                    break;
                }
                Some(_) => continue,
                None => return Err(FrameError::ConnectionClosed),
            }
        }
        if !synced {
            return Ok(None);
        }

        self.buf.clear();
        self.buf.put_u8(MAGIC[0]);
        self.grab_bytes(link, HEADER_SIZE - 1)?;

        let header = decode_header(&self.buf).ok_or(FrameError::InvalidMagic)?;

        let header_len = header.header_len as usize;
        if header_len > MAX_HEADER_SIZE {
            return Err(FrameError::HeaderTooLarge {
                size: header_len,
                max: MAX_HEADER_SIZE,
            });
        }
        if header_len > HEADER_SIZE {
            self.skip_bytes(link, header_len - HEADER_SIZE)?;
        }

        let payload_len = header.payload_len as usize;
        if payload_len > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload_len,
                max: self.config.max_payload_size,
            });
        }
        if payload_len == 0 {
            debug!("eISCP message did not contain a data segment");
            return Ok(None);
        }

        self.buf.clear();
        self.grab_bytes(link, payload_len)?;

        let command = trim_terminators(&self.buf);
        let message = Message::new(Bytes::copy_from_slice(command));
        debug!(%message, "received eISCP message");

        if !message.is_main_zone() {
            debug!(%message, "ignoring eISCP message not prefixed with !1");
            return Ok(None);
        }
        Ok(Some(message))
    }

    /// Consume and drop exactly `count` bytes, waiting at most `byte_timeout`
    /// for each.
    fn skip_bytes<L: ByteLink + ?Sized>(&mut self, link: &mut L, count: usize) -> Result<()> {
        for received in 0..count {
            if !link.has_data_ready(self.config.byte_timeout)? {
                return Err(FrameError::Timeout {
                    expected: count,
                    received,
                });
            }
            link.read_byte()?.ok_or(FrameError::ConnectionClosed)?;
        }
        Ok(())
    }

    /// Append exactly `count` bytes to the buffer, waiting at most
    /// `byte_timeout` for each.
    fn grab_bytes<L: ByteLink + ?Sized>(&mut self, link: &mut L, count: usize) -> Result<()> {
        self.buf.reserve(count);
        for received in 0..count {
            if !link.has_data_ready(self.config.byte_timeout)? {
                return Err(FrameError::Timeout {
                    expected: count,
                    received,
                });
            }
            let byte = link.read_byte()?.ok_or(FrameError::ConnectionClosed)?;
            self.buf.put_u8(byte);
        }
        Ok(())
    }
}

impl Default for MessageReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use avsync_transport::TransportError;
    use bytes::BytesMut;

    use super::*;
    use crate::codec::{encode_frame, EISCP_VERSION};

    /// Replays a fixed byte script; reports EOF once drained if `eof` is set.
    struct ScriptedLink {
        bytes: VecDeque<u8>,
        eof: bool,
        fail_reads: bool,
    }

    impl ScriptedLink {
        fn new(bytes: &[u8]) -> Self {
            Self {
                bytes: bytes.iter().copied().collect(),
                eof: false,
                fail_reads: false,
            }
        }

        fn closing(bytes: &[u8]) -> Self {
            Self {
                eof: true,
                ..Self::new(bytes)
            }
        }
    }

    impl ByteLink for ScriptedLink {
        fn connect(&mut self) -> avsync_transport::Result<()> {
            Ok(())
        }

        fn disconnect(&mut self) {}

        fn is_open(&self) -> bool {
            true
        }

        fn has_data_ready(&mut self, _timeout: Duration) -> avsync_transport::Result<bool> {
            Ok(!self.bytes.is_empty() || self.eof)
        }

        fn read_byte(&mut self) -> avsync_transport::Result<Option<u8>> {
            if self.fail_reads {
                return Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::ConnectionReset,
                )));
            }
            Ok(self.bytes.pop_front())
        }

        fn send_raw(&mut self, _data: &[u8]) -> avsync_transport::Result<()> {
            Ok(())
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn eiscp(command: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(command, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn delimited_skips_leading_terminators() {
        let mut link = ScriptedLink::new(b"\r\r!1PWR01\r");
        let mut reader = MessageReader::new();

        let message = reader
            .read_message(&mut link, Framing::Delimited)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), b"!1PWR01");
    }

    #[test]
    fn delimited_reads_consecutive_messages() {
        let mut link = ScriptedLink::new(b"!1PWR01\n!1MVL20\x1a");
        let mut reader = MessageReader::new();

        let first = reader.read_message(&mut link, Framing::Delimited).unwrap();
        let second = reader.read_message(&mut link, Framing::Delimited).unwrap();
        let third = reader.read_message(&mut link, Framing::Delimited).unwrap();

        assert_eq!(first.unwrap().as_bytes(), b"!1PWR01");
        assert_eq!(second.unwrap().as_bytes(), b"!1MVL20");
        assert!(third.is_none());
    }

    #[test]
    fn delimited_drops_noise_before_marker() {
        let mut link = ScriptedLink::new(b"xx!1PWR00\r");
        let mut reader = MessageReader::new();

        let message = reader
            .read_message(&mut link, Framing::Delimited)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), b"!1PWR00");
    }

    #[test]
    fn delimited_unterminated_returns_none() {
        let mut link = ScriptedLink::new(b"!1PWR01");
        let mut reader = MessageReader::new();

        let result = reader.read_message(&mut link, Framing::Delimited).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn delimited_idle_link_returns_none() {
        let mut link = ScriptedLink::new(b"");
        let mut reader = MessageReader::new();
        assert!(reader
            .read_message(&mut link, Framing::Delimited)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delimited_close_mid_message() {
        let mut link = ScriptedLink::closing(b"!1PW");
        let mut reader = MessageReader::new();

        let err = reader
            .read_message(&mut link, Framing::Delimited)
            .unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert!(err.is_link_failure());
    }

    #[test]
    fn delimited_overlong_message_is_rejected() {
        let mut stream = b"!1".to_vec();
        stream.extend(std::iter::repeat(b'A').take(64));
        let mut link = ScriptedLink::new(&stream);
        let mut reader = MessageReader::with_config(FrameConfig {
            max_message_len: 16,
            ..FrameConfig::default()
        });

        let err = reader
            .read_message(&mut link, Framing::Delimited)
            .unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLong { max: 16 }));
        assert!(!err.is_link_failure());
    }

    #[test]
    fn read_error_is_link_failure() {
        let mut link = ScriptedLink::new(b"!1PWR01\r");
        link.fail_reads = true;
        let mut reader = MessageReader::new();

        let err = reader
            .read_message(&mut link, Framing::Delimited)
            .unwrap_err();
        assert!(matches!(err, FrameError::Transport(_)));
        assert!(err.is_link_failure());
    }

    #[test]
    fn eiscp_reads_framed_message() {
        let mut link = ScriptedLink::new(&eiscp(b"!1PWR01"));
        let mut reader = MessageReader::new();

        let message = reader
            .read_message(&mut link, Framing::Eiscp)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), b"!1PWR01");
    }

    #[test]
    fn eiscp_strips_all_trailing_terminators() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        wire.put_u32(16);
        wire.put_u32(10);
        wire.put_u8(EISCP_VERSION);
        wire.put_bytes(0, 3);
        wire.put_slice(b"!1PWR01\x1a\r\n");

        let mut link = ScriptedLink::new(&wire);
        let mut reader = MessageReader::new();
        let message = reader
            .read_message(&mut link, Framing::Eiscp)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), b"!1PWR01");
    }

    #[test]
    fn eiscp_skips_extended_header() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        wire.put_u32(24);
        wire.put_u32(8);
        wire.put_u8(EISCP_VERSION);
        wire.put_bytes(0, 11);
        wire.put_slice(b"!1PWR00\r");

        let mut link = ScriptedLink::new(&wire);
        let mut reader = MessageReader::new();
        let message = reader
            .read_message(&mut link, Framing::Eiscp)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), b"!1PWR00");
    }

    #[test]
    fn eiscp_rejects_oversized_header_length() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        wire.put_u32(u32::MAX);
        wire.put_u32(8);
        wire.put_u8(EISCP_VERSION);
        wire.put_bytes(0, 3);
        wire.put_slice(b"!1PWR01\r");

        let mut link = ScriptedLink::new(&wire);
        let mut reader = MessageReader::new();
        let err = reader
            .read_message(&mut link, Framing::Eiscp)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::HeaderTooLarge { size, max: MAX_HEADER_SIZE } if size == u32::MAX as usize
        ));
        assert!(!err.is_link_failure());
        assert_eq!(link.bytes.len(), 8);
    }

    #[test]
    fn eiscp_resyncs_after_noise() {
        let mut stream = b"\r\n".to_vec();
        stream.extend(eiscp(b"!1MVL20"));
        let mut link = ScriptedLink::new(&stream);
        let mut reader = MessageReader::new();

        let message = reader
            .read_message(&mut link, Framing::Eiscp)
            .unwrap()
            .unwrap();
        assert_eq!(message.as_bytes(), b"!1MVL20");
    }

    #[test]
    fn eiscp_ignores_other_zones() {
        let mut link = ScriptedLink::new(&eiscp(b"!2PWR01"));
        let mut reader = MessageReader::new();
        assert!(reader
            .read_message(&mut link, Framing::Eiscp)
            .unwrap()
            .is_none());
    }

    #[test]
    fn eiscp_bad_magic_is_framing_error() {
        let mut wire = eiscp(b"!1PWR01");
        wire[1] = b'X';
        let mut link = ScriptedLink::new(&wire);
        let mut reader = MessageReader::new();

        let err = reader.read_message(&mut link, Framing::Eiscp).unwrap_err();
        assert!(matches!(err, FrameError::InvalidMagic));
        assert!(!err.is_link_failure());
    }

    #[test]
    fn eiscp_truncated_payload_times_out() {
        let mut wire = eiscp(b"!1PWR01");
        wire.truncate(HEADER_SIZE + 3);
        let mut link = ScriptedLink::new(&wire);
        let mut reader = MessageReader::new();

        let err = reader.read_message(&mut link, Framing::Eiscp).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Timeout {
                expected: 8,
                received: 3
            }
        ));
    }

    #[test]
    fn eiscp_oversized_payload_is_rejected() {
        let mut wire = BytesMut::new();
        wire.put_slice(&MAGIC);
        wire.put_u32(16);
        wire.put_u32(1024 * 1024);
        wire.put_u8(EISCP_VERSION);
        wire.put_bytes(0, 3);

        let mut link = ScriptedLink::new(&wire);
        let mut reader = MessageReader::new();
        let err = reader.read_message(&mut link, Framing::Eiscp).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn eiscp_close_mid_header() {
        let mut link = ScriptedLink::closing(b"ISC");
        let mut reader = MessageReader::new();

        let err = reader.read_message(&mut link, Framing::Eiscp).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }
}
