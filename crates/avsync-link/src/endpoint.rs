use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EndpointParseError};

/// Well-known eISCP TCP port.
pub const EISCP_PORT: u16 = 60128;

fn default_eiscp_port() -> u16 {
    EISCP_PORT
}

/// Medium and wire format used to reach a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// eISCP frames over TCP.
    Eiscp,
    /// Delimited ISCP over TCP, typically a serial-to-IP bridge.
    Tcp,
    /// Delimited ISCP over RS-232.
    Serial,
}

impl TransportKind {
    pub fn name(self) -> &'static str {
        match self {
            TransportKind::Eiscp => "EISCP",
            TransportKind::Tcp => "TCP",
            TransportKind::Serial => "Serial",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a receiver lives and how to talk to it.
///
/// Deserializes from the `mode`-tagged objects of the relay configuration:
/// `{"mode": "EISCP", "ip": "..."}`, `{"mode": "TCP", "ip": "...", "tcp_port": 23}`,
/// `{"mode": "Serial", "serial_port": "/dev/ttyUSB0"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum ReceiverEndpoint {
    #[serde(rename = "EISCP")]
    Eiscp {
        ip: String,
        #[serde(default = "default_eiscp_port")]
        port: u16,
    },
    #[serde(rename = "TCP")]
    Tcp { ip: String, tcp_port: u16 },
    #[serde(rename = "Serial")]
    Serial { serial_port: String },
}

impl ReceiverEndpoint {
    /// eISCP endpoint on the well-known port.
    pub fn eiscp(ip: impl Into<String>) -> Self {
        ReceiverEndpoint::Eiscp {
            ip: ip.into(),
            port: EISCP_PORT,
        }
    }

    pub fn tcp(ip: impl Into<String>, tcp_port: u16) -> Self {
        ReceiverEndpoint::Tcp {
            ip: ip.into(),
            tcp_port,
        }
    }

    pub fn serial(serial_port: impl Into<String>) -> Self {
        ReceiverEndpoint::Serial {
            serial_port: serial_port.into(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            ReceiverEndpoint::Eiscp { .. } => TransportKind::Eiscp,
            ReceiverEndpoint::Tcp { .. } => TransportKind::Tcp,
            ReceiverEndpoint::Serial { .. } => TransportKind::Serial,
        }
    }

    /// Address part without the scheme: `host:port` or the device path.
    pub fn address(&self) -> String {
        match self {
            ReceiverEndpoint::Eiscp { ip, port } => format!("{ip}:{port}"),
            ReceiverEndpoint::Tcp { ip, tcp_port } => format!("{ip}:{tcp_port}"),
            ReceiverEndpoint::Serial { serial_port } => serial_port.clone(),
        }
    }

    /// Reject values serde accepts but no link can use.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self {
            ReceiverEndpoint::Eiscp { ip, port } => {
                require_host(ip, "EISCP")?;
                require_port(*port, "EISCP")
            }
            ReceiverEndpoint::Tcp { ip, tcp_port } => {
                require_host(ip, "TCP")?;
                require_port(*tcp_port, "TCP")
            }
            ReceiverEndpoint::Serial { serial_port } => {
                if serial_port.trim().is_empty() {
                    return Err(ConfigError::Invalid(
                        "serial_port must not be empty for Serial".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn require_host(ip: &str, mode: &str) -> std::result::Result<(), ConfigError> {
    if ip.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "ip must not be empty for {mode}"
        )));
    }
    Ok(())
}

fn require_port(port: u16, mode: &str) -> std::result::Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Invalid(format!("port must not be 0 for {mode}")));
    }
    Ok(())
}

impl fmt::Display for ReceiverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverEndpoint::Eiscp { .. } => write!(f, "eiscp://{}", self.address()),
            ReceiverEndpoint::Tcp { .. } => write!(f, "tcp://{}", self.address()),
            ReceiverEndpoint::Serial { serial_port } => write!(f, "serial:{serial_port}"),
        }
    }
}

/// Parses `eiscp://host[:port]`, `tcp://host:port` and `serial:<device>`.
impl FromStr for ReceiverEndpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let input = s.trim();

        if let Some(rest) = input.strip_prefix("eiscp://") {
            let (ip, port) = split_host_port(rest, input)?;
            return Ok(ReceiverEndpoint::Eiscp {
                ip,
                port: port.unwrap_or(EISCP_PORT),
            });
        }

        if let Some(rest) = input.strip_prefix("tcp://") {
            let (ip, port) = split_host_port(rest, input)?;
            let tcp_port = port.ok_or_else(|| EndpointParseError::MissingPort(input.to_string()))?;
            return Ok(ReceiverEndpoint::Tcp { ip, tcp_port });
        }

        if let Some(rest) = input.strip_prefix("serial:") {
            let device = rest.strip_prefix("//").unwrap_or(rest);
            if device.is_empty() {
                return Err(EndpointParseError::MissingDevice(input.to_string()));
            }
            return Ok(ReceiverEndpoint::Serial {
                serial_port: device.to_string(),
            });
        }

        Err(EndpointParseError::UnknownScheme(input.to_string()))
    }
}

fn split_host_port(
    rest: &str,
    input: &str,
) -> std::result::Result<(String, Option<u16>), EndpointParseError> {
    let rest = rest.trim_end_matches('/');

    // Bracketed IPv6: [::1] or [::1]:60128
    if let Some(bracketed) = rest.strip_prefix('[') {
        let (host, tail) = bracketed
            .split_once(']')
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_string()))?;
        if host.is_empty() {
            return Err(EndpointParseError::MissingHost(input.to_string()));
        }
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(parse_port(port, input)?),
            None if tail.is_empty() => None,
            None => return Err(EndpointParseError::InvalidPort(input.to_string())),
        };
        return Ok((host.to_string(), port));
    }

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (host, Some(parse_port(port, input)?)),
        None => (rest, None),
    };
    if host.is_empty() {
        return Err(EndpointParseError::MissingHost(input.to_string()));
    }
    Ok((host.to_string(), port))
}

fn parse_port(port: &str, input: &str) -> std::result::Result<u16, EndpointParseError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(EndpointParseError::InvalidPort(input.to_string())),
        Ok(port) => Ok(port),
    }
}
