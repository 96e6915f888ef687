//! ISCP message type and the byte conventions used to route it.

use std::fmt;

use bytes::Bytes;

/// First byte of every ISCP message.
pub const START_MARKER: u8 = b'!';

/// Bytes that end a delimited message: CR, LF and EOF (0x1A).
pub const TERMINATORS: [u8; 3] = [b'\r', b'\n', 0x1A];

/// Prefix of every main-zone message.
pub const MAIN_ZONE_PREFIX: &[u8] = b"!1";

/// Prefix of every main-zone power message.
pub const POWER_PREFIX: &[u8] = b"!1PWR";

/// Asks a receiver to report its power state.
pub const POWER_QUERY: &[u8] = b"!1PWRQSTN";

/// Returns true for CR, LF and EOF.
pub fn is_terminator(byte: u8) -> bool {
    TERMINATORS.contains(&byte)
}

/// Strip any run of trailing terminators.
pub fn trim_terminators(mut data: &[u8]) -> &[u8] {
    while let [rest @ .., last] = data {
        if !is_terminator(*last) {
            break;
        }
        data = rest;
    }
    data
}

/// One ISCP command, without framing or terminator.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Message(Bytes);

impl Message {
    /// Wrap raw command bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Message bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the message and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Main-zone power query, set or report (`!1PWR...`).
    pub fn is_power(&self) -> bool {
        self.0.starts_with(POWER_PREFIX)
    }

    /// Addressed to the main zone (`!1...`).
    pub fn is_main_zone(&self) -> bool {
        self.0.starts_with(MAIN_ZONE_PREFIX)
    }

    /// Zone digit following the start marker, e.g. `b'2'` for `!2PWR01`.
    pub fn zone(&self) -> Option<u8> {
        match self.as_bytes() {
            [START_MARKER, zone, ..] => Some(*zone),
            _ => None,
        }
    }

    /// Three-letter command code, e.g. `PWR`.
    pub fn command(&self) -> Option<&[u8]> {
        self.0.get(2..5)
    }

    /// Everything after the command code, e.g. `01` or `QSTN`.
    pub fn parameter(&self) -> Option<&[u8]> {
        self.0.get(5..)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message(\"{}\")", self.0.escape_ascii())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.escape_ascii())
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for Message {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for Message {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&'static [u8]> for Message {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}
