//! Inference gateway conformance CLI library

#![deny(missing_docs)]

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

use conformance_common::telemetry::LogFormat;

/// Conformance tests for Gateway API inference extension implementations
#[derive(Parser, Debug)]
#[command(name = "inference-conformance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, env = "CONFORMANCE_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the conformance tests against a cluster
    Run(commands::run::RunArgs),
    /// List the registered tests
    List(commands::list::ListArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => commands::run::run(args).await,
            Commands::List(args) => commands::list::run(args),
        }
    }
}
