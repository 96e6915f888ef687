use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use avsync_frame::{Message, POWER_QUERY};
use tracing::{debug, error, info};

use crate::config::{LinkConfig, RelayConfig};
use crate::connection::Connection;
use crate::error::{LinkError, Result};
use crate::transport::{Link, Transport};

/// Nominal interval between power-state probes of the primary.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(10);

/// Outcome of relaying one primary message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardReport {
    /// Secondaries the message was written to.
    pub delivered: usize,
    /// Secondaries whose send failed after its retry.
    pub failed: usize,
}

impl ForwardReport {
    /// True when the message was relayed to nobody because it was filtered out
    /// or there are no secondaries.
    pub fn is_empty(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

type Secondaries<L> = Arc<Vec<Arc<Connection<L>>>>;

/// One primary receiver whose power messages are mirrored to every secondary.
pub struct Relay<L: Link + 'static = Transport> {
    primary: Arc<Connection<L>>,
    secondaries: Secondaries<L>,
}

impl Relay<Transport> {
    /// Build closed connections for every endpoint in `config`.
    pub fn from_config(config: &RelayConfig, link_config: LinkConfig) -> Self {
        let primary = Transport::from_endpoint(&config.primary, &link_config);
        let secondaries = config
            .secondaries
            .iter()
            .map(|endpoint| Transport::from_endpoint(endpoint, &link_config))
            .collect();
        Self::new(primary, secondaries, link_config)
    }

    /// Load, validate and build from a JSON configuration file.
    pub fn from_config_path(path: impl AsRef<Path>, link_config: LinkConfig) -> Result<Self> {
        let config = RelayConfig::load(path).map_err(LinkError::Config)?;
        Ok(Self::from_config(&config, link_config))
    }
}

impl<L: Link + 'static> Relay<L> {
    /// Wire `primary`'s inbound messages to the forwarding handler.
    ///
    /// Secondaries get no handler; their listeners only drain inbound bytes.
    pub fn new(primary: L, secondaries: Vec<L>, config: LinkConfig) -> Self {
        let secondaries: Secondaries<L> = Arc::new(
            secondaries
                .into_iter()
                .enumerate()
                .map(|(index, link)| {
                    Arc::new(Connection::new(
                        format!("secondary-{}", index + 1),
                        link,
                        config.clone(),
                    ))
                })
                .collect(),
        );

        let targets = Arc::clone(&secondaries);
        let primary = Connection::new("primary", primary, config).with_handler(Arc::new(
            move |message: &Message| {
                forward_power_message(&targets, message);
            },
        ));

        Self {
            primary: Arc::new(primary),
            secondaries,
        }
    }

    pub fn primary(&self) -> &Arc<Connection<L>> {
        &self.primary
    }

    pub fn secondaries(&self) -> &[Arc<Connection<L>>] {
        &self.secondaries
    }

    /// The primary followed by the secondaries in configuration order.
    pub fn connections(&self) -> impl Iterator<Item = &Arc<Connection<L>>> {
        std::iter::once(&self.primary).chain(self.secondaries.iter())
    }

    /// Ask the primary for its power state. The reply arrives through the
    /// primary's listener and is relayed like any other power message.
    pub fn probe_primary(&self) -> Result<()> {
        debug!(endpoint = %self.primary.endpoint(), "probing primary power state");
        self.primary.send_message(POWER_QUERY)
    }

    /// Relay `message` to every secondary if it is a power message.
    pub fn on_primary_message(&self, message: &Message) -> ForwardReport {
        forward_power_message(&self.secondaries, message)
    }

    /// Close every link. Listener threads still running will reconnect, so
    /// stop them first.
    pub fn shutdown(&self) {
        for connection in self.connections() {
            connection.disconnect();
        }
        info!("relay shut down");
    }
}

impl<L: Link + 'static> Drop for Relay<L> {
    fn drop(&mut self) {
        for connection in self.connections() {
            connection.disconnect();
        }
    }
}

impl<L: Link + 'static> std::fmt::Debug for Relay<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("primary", &self.primary)
            .field("secondaries", &self.secondaries.len())
            .finish()
    }
}

fn forward_power_message<L: Link>(
    secondaries: &[Arc<Connection<L>>],
    message: &Message,
) -> ForwardReport {
    let mut report = ForwardReport::default();
    if !message.is_power() {
        debug!(%message, "ignoring non-power message");
        return report;
    }

    info!(%message, secondaries = secondaries.len(), "forwarding power message");
    for secondary in secondaries {
        match secondary.send_message(message.as_bytes()) {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                report.failed += 1;
                error!(
                    connection = %secondary.name(),
                    endpoint = %secondary.endpoint(),
                    %message,
                    error = %err,
                    "failed to forward power message"
                );
            }
        }
    }
    report
}
