use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use avsync_link::{Connection, LinkConfig, PollOutcome, Transport};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, parse_endpoint, MonitorArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let config = LinkConfig::default();
    let connection = Connection::new("monitor", Transport::from_endpoint(&endpoint, &config), config);
    let label = endpoint.to_string();

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    info!(endpoint = %label, "monitoring receiver");
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        if let PollOutcome::Message(message) = connection.poll_once() {
            print_message(&message, &label, format);
            printed = printed.saturating_add(1);

            if let Some(count) = args.count {
                if printed >= count {
                    break;
                }
            }
        }
    }

    connection.disconnect();
    Ok(SUCCESS)
}
