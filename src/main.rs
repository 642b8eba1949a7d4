use std::path::PathBuf;

use anyhow::Context;
use backdrop::{Config, Server, compose, logger};
use clap::Parser;

/// Placeholder text, image, and JSON backend.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file. Built-in defaults apply when omitted.
    #[arg(long, env = "BACKDROP_CONFIG")]
    config_path: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(long, env = "BACKDROP_ADDRESS")]
    address: Option<String>,

    /// Log level, overriding the config file.
    #[arg(long, env = "BACKDROP_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(address) = args.address {
        config.address = address;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    let logger = logger::build(&config.log_level, config.log_format)
        .context("configuring logger")?;

    let app = compose::router(&config, &logger);

    Server::bind(&config.address)
        .await?
        .logger(logger)
        .serve(app)
        .await
        .context("serving")
}
