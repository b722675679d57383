//! CLI command implementations

use std::path::Path;

use serde_json::json;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response};
use super::protocol::Session;
use crate::config::StoreConfig;
use crate::store::MemoryStore;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Start { config } => start(config.as_deref()),
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<StoreConfig> {
    match path {
        Some(path) => Ok(StoreConfig::load(path)?),
        None => Ok(StoreConfig::default()),
    }
}

/// Open a store and serve requests until stdin closes.
///
/// A failed request is answered with an error line and the loop continues.
/// An I/O error or a store fault ends the session. Transactions still open
/// at the end are rolled back.
pub fn start(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store = MemoryStore::new(config)?;
    let mut session = Session::new(store);
    let mut fatal: Option<CliError> = None;

    for request in read_requests() {
        let outcome = request.and_then(|value| session.handle_value(value));
        match outcome {
            Ok(data) => write_response(data)?,
            Err(e) => {
                write_error(e.code_str(), e.message())?;
                if e.ends_session() {
                    fatal = Some(e);
                    break;
                }
            }
        }
    }

    session.close();
    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Validate a configuration file and print the effective settings.
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = StoreConfig::load(config_path)?;
    write_response(json!({
        "valid": true,
        "config": config
    }))
}
