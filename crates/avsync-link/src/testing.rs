//! In-memory link double shared by the connection and relay tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use avsync_frame::Framing;
use avsync_transport::{ByteLink, TransportError};

use crate::config::LinkConfig;
use crate::transport::Link;

/// Observable side of a [`MockLink`]; clones share state.
#[derive(Clone, Default)]
pub(crate) struct MockHandle {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    connect_attempts: Arc<Mutex<Vec<Instant>>>,
    failing_connects: Arc<AtomicUsize>,
    failing_sends: Arc<AtomicUsize>,
    reset_next_read: Arc<AtomicBool>,
}

impl MockHandle {
    pub(crate) fn push_inbound(&self, bytes: &[u8]) {
        self.inbound.lock().unwrap().extend(bytes.iter().copied());
    }

    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn connect_attempts(&self) -> Vec<Instant> {
        self.connect_attempts.lock().unwrap().clone()
    }

    pub(crate) fn fail_connects(&self, count: usize) {
        self.failing_connects.store(count, Ordering::SeqCst);
    }

    pub(crate) fn fail_sends(&self, count: usize) {
        self.failing_sends.store(count, Ordering::SeqCst);
    }

    pub(crate) fn reset_next_read(&self) {
        self.reset_next_read.store(true, Ordering::SeqCst);
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

pub(crate) struct MockLink {
    handle: MockHandle,
    framing: Framing,
    open: bool,
    name: String,
}

impl MockLink {
    pub(crate) fn new(name: &str, framing: Framing) -> (Self, MockHandle) {
        let handle = MockHandle::default();
        let link = Self {
            handle: handle.clone(),
            framing,
            open: false,
            name: name.to_string(),
        };
        (link, handle)
    }
}

impl ByteLink for MockLink {
    fn connect(&mut self) -> avsync_transport::Result<()> {
        self.handle.connect_attempts.lock().unwrap().push(Instant::now());
        if take_one(&self.handle.failing_connects) {
            self.open = false;
            return Err(TransportError::Connect {
                endpoint: self.name.clone(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        self.open = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn has_data_ready(&mut self, _timeout: Duration) -> avsync_transport::Result<bool> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        Ok(self.handle.reset_next_read.load(Ordering::SeqCst)
            || !self.handle.inbound.lock().unwrap().is_empty())
    }

    fn read_byte(&mut self) -> avsync_transport::Result<Option<u8>> {
        if self.handle.reset_next_read.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            )));
        }
        Ok(self.handle.inbound.lock().unwrap().pop_front())
    }

    fn send_raw(&mut self, data: &[u8]) -> avsync_transport::Result<()> {
        if !self.open {
            return Err(TransportError::NotConnected);
        }
        if take_one(&self.handle.failing_sends) {
            return Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            )));
        }
        self.handle.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl Link for MockLink {
    fn framing(&self) -> Framing {
        self.framing
    }
}

/// Timings shrunk so backoff paths run in milliseconds.
pub(crate) fn fast_config() -> LinkConfig {
    LinkConfig {
        poll_timeout: Duration::from_millis(1),
        byte_timeout: Duration::from_millis(5),
        reconnect_backoff: Duration::from_millis(20),
        ..LinkConfig::default()
    }
}
