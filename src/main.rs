use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod clipper;
mod config;
mod db;
mod logger;
mod models;
mod render;
mod sanitize;

/// Feed aggregator / clipping tool driven by a JSON config file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file.
    #[arg(default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init(logger::LogConfig::default())?;

    let args = Args::parse();
    let config = config::Config::load(&args.config)?;
    config::run(config).await
}
