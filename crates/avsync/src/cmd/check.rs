use avsync_link::RelayConfig;
use tracing::debug;

use crate::cmd::CheckArgs;
use crate::exit::{config_error, CliResult, SUCCESS};
use crate::output::{print_endpoints, OutputFormat};

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let config = RelayConfig::load(&args.config)
        .map_err(|err| config_error("failed loading config", err))?;
    debug!(config = %args.config.display(), "configuration is valid");

    print_endpoints(&config, format);
    Ok(SUCCESS)
}
