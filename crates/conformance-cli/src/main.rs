//! Inference gateway conformance CLI
//!
//! Runs the registered conformance tests against the cluster in the current
//! kubeconfig context.

use clap::Parser;

use conformance_cli::{Cli, Result};
use conformance_common::telemetry::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;
    cli.run().await
}
