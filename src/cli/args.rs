//! CLI argument definitions using clap
//!
//! Commands:
//! - aerordf start [--config <path>]
//! - aerordf check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerordf - An in-memory, multi-version RDF quad store
#[derive(Parser, Debug)]
#[command(name = "aerordf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a store and serve JSON requests from stdin
    Start {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file and print the effective settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long)]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_without_config() {
        let cli = Cli::try_parse_from(["aerordf", "start"]).unwrap();
        assert!(matches!(cli.command, Command::Start { config: None }));
    }

    #[test]
    fn test_check_config_requires_path() {
        assert!(Cli::try_parse_from(["aerordf", "check-config"]).is_err());
        let cli = Cli::try_parse_from(["aerordf", "check-config", "--config", "store.json"]).unwrap();
        match cli.command {
            Command::CheckConfig { config } => assert_eq!(config, PathBuf::from("store.json")),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
