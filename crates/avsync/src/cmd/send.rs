use avsync_frame::{MAIN_ZONE_PREFIX, START_MARKER};
use avsync_link::{Connection, LinkConfig, Transport};

use crate::cmd::{parse_endpoint, SendArgs};
use crate::exit::{link_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let command = resolve_command(&args.command)?;

    let config = LinkConfig::default();
    let link = Transport::from_endpoint(&endpoint, &config);
    let connection = Connection::new("send", link, config);

    let result = connection
        .send_message(&command)
        .map_err(|err| link_error("send failed", err));
    connection.disconnect();
    result?;

    Ok(SUCCESS)
}

/// Accept `!1PWR01` as is and address a bare `PWR01` to the main zone.
fn resolve_command(input: &str) -> CliResult<Vec<u8>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "command must not be empty"));
    }
    if !input.is_ascii() {
        return Err(CliError::new(USAGE, "command must be ASCII"));
    }

    if input.as_bytes()[0] == START_MARKER {
        return Ok(input.as_bytes().to_vec());
    }
    let mut command = MAIN_ZONE_PREFIX.to_vec();
    command.extend_from_slice(input.as_bytes());
    Ok(command)
}
