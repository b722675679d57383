//! CLI module for aerordf
//!
//! Provides command-line interface for:
//! - start: open a store and serve JSON line requests on stdin
//! - check-config: validate a configuration file

mod args;
mod commands;
mod errors;
mod io;
mod protocol;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, start};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
pub use protocol::{Request, Session};
