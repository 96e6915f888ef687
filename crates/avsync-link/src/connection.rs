use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use avsync_frame::{encode_outbound, Message, MessageReader};
use tracing::{debug, error};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::transport::{Link, Transport};

/// Callback invoked with every message a connection assembles.
pub type MessageHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Externally observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// What one [`Connection::poll_once`] pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A complete message arrived and was handed to the handler.
    Message(Message),
    /// Nothing complete arrived within the poll timeout.
    Idle,
    /// A malformed or incomplete message was dropped.
    Discarded,
    /// The link failed and was closed; the next pass reconnects.
    Disconnected,
    /// Connecting failed; the pass slept for the reconnect backoff.
    ConnectFailed,
}

struct Inner<L> {
    link: L,
    reader: MessageReader,
    state: ConnectionState,
}

impl<L: Link> Inner<L> {
    fn ensure_connected(&mut self) -> avsync_transport::Result<()> {
        if self.state == ConnectionState::Connected && self.link.is_open() {
            return Ok(());
        }
        self.state = ConnectionState::Disconnected;
        self.link.connect()?;
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn force_disconnect(&mut self) {
        self.link.disconnect();
        self.state = ConnectionState::Disconnected;
    }
}

/// A receiver link with reconnect handling and message assembly.
///
/// All access to the link goes through one mutex, so a connection can be
/// listened on by its own thread while other threads send through it. The
/// listener holds the lock for a single poll at a time.
pub struct Connection<L: Link = Transport> {
    name: String,
    inner: Mutex<Inner<L>>,
    handler: Option<MessageHandler>,
    config: LinkConfig,
}

impl<L: Link> Connection<L> {
    /// Wrap a closed link. Nothing connects until the first poll or send.
    pub fn new(name: impl Into<String>, link: L, config: LinkConfig) -> Self {
        let reader = MessageReader::with_config(config.frame_config());
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                link,
                reader,
                state: ConnectionState::Disconnected,
            }),
            handler: None,
            config,
        }
    }

    /// Register the callback for inbound messages.
    pub fn with_handler(mut self, handler: MessageHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Role name used in logs, e.g. `primary`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the underlying link.
    pub fn endpoint(&self) -> String {
        self.lock().link.describe()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Connect now unless already connected.
    pub fn connect(&self) -> Result<()> {
        self.lock().ensure_connected()?;
        Ok(())
    }

    /// Close the link. Idempotent.
    pub fn disconnect(&self) {
        self.lock().force_disconnect();
    }

    /// Run one listen pass: connect if needed, then try to read one message.
    ///
    /// A connect failure sleeps for the reconnect backoff before returning.
    /// The handler runs after the link lock is released.
    pub fn poll_once(&self) -> PollOutcome {
        let outcome = {
            let mut guard = self.lock();
            let inner = &mut *guard;

            if inner.state == ConnectionState::Disconnected || !inner.link.is_open() {
                if let Err(err) = inner.ensure_connected() {
                    let endpoint = inner.link.describe();
                    drop(guard);
                    error!(
                        connection = %self.name,
                        %endpoint,
                        error = %err,
                        "unable to connect to receiver"
                    );
                    std::thread::sleep(self.config.reconnect_backoff);
                    return PollOutcome::ConnectFailed;
                }
            }

            let framing = inner.link.framing();
            match inner.reader.read_message(&mut inner.link, framing) {
                Ok(Some(message)) => PollOutcome::Message(message),
                Ok(None) => PollOutcome::Idle,
                Err(err) if err.is_link_failure() => {
                    error!(
                        connection = %self.name,
                        endpoint = %inner.link.describe(),
                        error = %err,
                        "connection to receiver failed"
                    );
                    inner.force_disconnect();
                    PollOutcome::Disconnected
                }
                Err(err) => {
                    debug!(connection = %self.name, error = %err, "discarding malformed message");
                    PollOutcome::Discarded
                }
            }
        };

        if let PollOutcome::Message(message) = &outcome {
            if let Some(handler) = &self.handler {
                handler(message);
            }
        }
        outcome
    }

    /// Poll until `running` is cleared.
    pub fn listen(&self, running: &AtomicBool) {
        debug!(connection = %self.name, "listening");
        while running.load(Ordering::SeqCst) {
            self.poll_once();
        }
        debug!(connection = %self.name, "stopped listening");
    }

    /// Poll for the rest of the process lifetime.
    pub fn listen_forever(&self) -> ! {
        loop {
            self.poll_once();
        }
    }

    /// Shape `payload` for this link and write it.
    ///
    /// Connects first if needed. If the write fails, waits the reconnect
    /// backoff, reconnects and retries exactly once; a second failure is
    /// returned as [`LinkError::SendFailed`].
    pub fn send_message(&self, payload: &[u8]) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let framing = inner.link.framing();
        let wire = encode_outbound(framing, payload)?;
        inner.ensure_connected()?;

        let err = match inner.link.send_raw(&wire) {
            Ok(()) => {
                debug!(
                    connection = %self.name,
                    framing = framing.name(),
                    message = %payload.escape_ascii(),
                    "sent message"
                );
                return Ok(());
            }
            Err(err) => err,
        };

        debug!(
            connection = %self.name,
            error = %err,
            "send failed, reconnecting and trying again"
        );
        std::thread::sleep(self.config.reconnect_backoff);
        inner.force_disconnect();

        let retried = match inner.ensure_connected() {
            Ok(()) => inner.link.send_raw(&wire),
            Err(err) => Err(err),
        };
        match retried {
            Ok(()) => {
                debug!(connection = %self.name, message = %payload.escape_ascii(), "sent message on retry");
                Ok(())
            }
            Err(source) => {
                inner.force_disconnect();
                Err(LinkError::SendFailed {
                    endpoint: inner.link.describe(),
                    source,
                })
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<L>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: Link> std::fmt::Debug for Connection<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
