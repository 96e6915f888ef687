use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use avsync_link::{LinkConfig, Relay, RelayConfig};
use tracing::{error, info};

use crate::cmd::{install_ctrlc_handler, parse_duration, RunArgs};
use crate::exit::{config_error, io_error, CliResult, SUCCESS};

/// Granularity of the scheduler's checks for shutdown.
const TICK: Duration = Duration::from_millis(100);

pub fn run(args: RunArgs) -> CliResult<i32> {
    let probe_interval = parse_duration(&args.probe_interval)?;
    let config = RelayConfig::load(&args.config)
        .map_err(|err| config_error("failed loading config", err))?;

    info!(
        config = %args.config.display(),
        primary = %config.primary,
        secondaries = config.secondaries.len(),
        "starting relay"
    );
    let relay = Relay::from_config(&config, LinkConfig::default());

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut listeners = Vec::new();
    for connection in relay.connections() {
        let connection = Arc::clone(connection);
        let running = Arc::clone(&running);
        let listener = thread::Builder::new()
            .name(connection.name().to_string())
            .spawn(move || connection.listen(&running))
            .map_err(|err| io_error("failed starting listener", err))?;
        listeners.push(listener);
    }

    let mut next_probe = Instant::now();
    while running.load(Ordering::SeqCst) {
        if Instant::now() >= next_probe {
            if let Err(err) = relay.probe_primary() {
                error!(error = %err, "power probe failed");
            }
            next_probe = Instant::now() + probe_interval;
        }
        thread::sleep(TICK.min(next_probe.saturating_duration_since(Instant::now())));
    }

    info!("shutting down");
    for listener in listeners {
        if listener.join().is_err() {
            error!("listener thread panicked");
        }
    }
    relay.shutdown();

    Ok(SUCCESS)
}
