//! itemsync CLI: sync the item sheet into per-category YAML files.
//!
//! Downloads (or reuses) the item sheet export, resolves every kept item
//! against the existing index or its item page, and writes one file per
//! item category.

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
