use std::time::Duration;

use avsync_frame::Framing;
use avsync_transport::{ByteLink, SerialLink, TcpLink};

use crate::config::LinkConfig;
use crate::endpoint::{ReceiverEndpoint, TransportKind};

/// A byte link that also knows how its messages are framed.
pub trait Link: ByteLink + Send {
    fn framing(&self) -> Framing;
}

/// The concrete link for each [`TransportKind`].
#[derive(Debug)]
pub enum Transport {
    /// eISCP frames over TCP.
    Eiscp(TcpLink),
    /// Delimited ISCP over TCP.
    Tcp(TcpLink),
    /// Delimited ISCP over RS-232.
    Serial(SerialLink),
}

impl Transport {
    /// Build the closed link an endpoint describes.
    pub fn from_endpoint(endpoint: &ReceiverEndpoint, config: &LinkConfig) -> Self {
        match endpoint {
            ReceiverEndpoint::Eiscp { ip, port } => Transport::Eiscp(
                TcpLink::new(ip.clone(), *port).with_connect_timeout(config.connect_timeout),
            ),
            ReceiverEndpoint::Tcp { ip, tcp_port } => Transport::Tcp(
                TcpLink::new(ip.clone(), *tcp_port).with_connect_timeout(config.connect_timeout),
            ),
            ReceiverEndpoint::Serial { serial_port } => {
                Transport::Serial(SerialLink::new(serial_port.clone()))
            }
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Eiscp(_) => TransportKind::Eiscp,
            Transport::Tcp(_) => TransportKind::Tcp,
            Transport::Serial(_) => TransportKind::Serial,
        }
    }

    fn inner(&self) -> &dyn ByteLink {
        match self {
            Transport::Eiscp(link) | Transport::Tcp(link) => link,
            Transport::Serial(link) => link,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ByteLink {
        match self {
            Transport::Eiscp(link) | Transport::Tcp(link) => link,
            Transport::Serial(link) => link,
        }
    }
}

impl ByteLink for Transport {
    fn connect(&mut self) -> avsync_transport::Result<()> {
        self.inner_mut().connect()
    }

    fn disconnect(&mut self) {
        self.inner_mut().disconnect()
    }

    fn is_open(&self) -> bool {
        self.inner().is_open()
    }

    fn has_data_ready(&mut self, timeout: Duration) -> avsync_transport::Result<bool> {
        self.inner_mut().has_data_ready(timeout)
    }

    fn read_byte(&mut self) -> avsync_transport::Result<Option<u8>> {
        self.inner_mut().read_byte()
    }

    fn send_raw(&mut self, data: &[u8]) -> avsync_transport::Result<()> {
        self.inner_mut().send_raw(data)
    }

    fn describe(&self) -> String {
        match self {
            Transport::Eiscp(link) => format!("eiscp://{}", link.describe()),
            Transport::Tcp(link) => format!("tcp://{}", link.describe()),
            Transport::Serial(link) => format!("serial:{}", link.describe()),
        }
    }
}

impl Link for Transport {
    fn framing(&self) -> Framing {
        match self {
            Transport::Eiscp(_) => Framing::Eiscp,
            Transport::Tcp(_) | Transport::Serial(_) => Framing::Delimited,
        }
    }
}
