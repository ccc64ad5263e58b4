//! Lexhound CLI: official source discovery and validation for drug law.
//!
//! Finds live government sources per jurisdiction, captures content-addressed
//! snapshots, and maintains the source catalog and registry.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
