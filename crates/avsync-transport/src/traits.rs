use std::time::Duration;

use crate::error::Result;

/// Byte-level capabilities every receiver link provides.
///
/// Implementations own their OS handle and are driven by a single caller at a
/// time; serialization across threads is the caller's job.
pub trait ByteLink {
    /// Open the underlying handle. Calling this on an open link reopens it.
    fn connect(&mut self) -> Result<()>;

    /// Close the underlying handle. Idempotent.
    fn disconnect(&mut self);

    /// Whether the handle is currently open.
    fn is_open(&self) -> bool;

    /// Wait up to `timeout` for at least one readable byte.
    ///
    /// A peer that has closed the link counts as readable; the following
    /// [`read_byte`](Self::read_byte) reports it.
    fn has_data_ready(&mut self, timeout: Duration) -> Result<bool>;

    /// Read a single byte. `Ok(None)` means the peer closed the stream.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write all of `data` to the link.
    fn send_raw(&mut self, data: &[u8]) -> Result<()>;

    /// Human-readable address for diagnostics.
    fn describe(&self) -> String;
}

impl<T: ByteLink + ?Sized> ByteLink for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn has_data_ready(&mut self, timeout: Duration) -> Result<bool> {
        (**self).has_data_ready(timeout)
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        (**self).send_raw(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
