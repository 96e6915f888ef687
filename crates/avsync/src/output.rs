use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use avsync_frame::Message;
use avsync_link::RelayConfig;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    endpoint: &'a str,
    message: String,
    command: String,
    parameter: String,
    power: bool,
    timestamp: String,
}

pub fn print_message(message: &Message, endpoint: &str, format: OutputFormat) {
    let command = text_or_empty(message.command());
    let parameter = text_or_empty(message.parameter());

    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                endpoint,
                message: message.to_string(),
                command,
                parameter,
                power: message.is_power(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "COMMAND", "PARAMETER", "MESSAGE"])
                .add_row(vec![
                    endpoint.to_string(),
                    command,
                    parameter,
                    message.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "endpoint={} command={} parameter={} power={}",
                endpoint,
                command,
                parameter,
                message.is_power()
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(message.as_bytes());
            let _ = out.write_all(b"\n");
            let _ = out.flush();
        }
    }
}

#[derive(Serialize)]
struct EndpointOutput {
    role: String,
    mode: &'static str,
    address: String,
    endpoint: String,
}

fn endpoint_rows(config: &RelayConfig) -> Vec<EndpointOutput> {
    let primary = std::iter::once(("primary".to_string(), &config.primary));
    let secondaries = config
        .secondaries
        .iter()
        .enumerate()
        .map(|(index, endpoint)| (format!("secondary-{}", index + 1), endpoint));

    primary
        .chain(secondaries)
        .map(|(role, endpoint)| EndpointOutput {
            role,
            mode: endpoint.kind().name(),
            address: endpoint.address(),
            endpoint: endpoint.to_string(),
        })
        .collect()
}

pub fn print_endpoints(config: &RelayConfig, format: OutputFormat) {
    let rows = endpoint_rows(config);

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ROLE", "MODE", "ADDRESS"]);
            for row in &rows {
                table.add_row(vec![row.role.clone(), row.mode.to_string(), row.address.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{} mode={} address={}", row.role, row.mode, row.address);
            }
        }
        OutputFormat::Raw => {
            for row in &rows {
                println!("{}", row.endpoint);
            }
        }
    }
}

fn text_or_empty(part: Option<&[u8]>) -> String {
    part.map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
