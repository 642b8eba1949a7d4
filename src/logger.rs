//! Logger construction.
//!
//! The server never installs a global subscriber. [`build`] returns a
//! [`Dispatch`] that startup code hands to the [`Server`](crate::Server)
//! and to the [`RequestLogger`](crate::middleware::RequestLogger).

use serde::Deserialize;
use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;

use crate::error::Error;

/// Output format of the log sink.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Parses a verbosity name, case-insensitively.
///
/// Accepts `trace`, `debug`, `info`, `warn`/`warning`, `error`, and `off`.
/// `fatal` and `panic` are taken as `error`, the most severe level there is.
pub fn parse_level(level: &str) -> Result<LevelFilter, Error> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::TRACE),
        "debug" => Ok(LevelFilter::DEBUG),
        "info" => Ok(LevelFilter::INFO),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "error" | "fatal" | "panic" => Ok(LevelFilter::ERROR),
        "off" => Ok(LevelFilter::OFF),
        _ => Err(Error::LogLevel(level.to_owned())),
    }
}

/// Builds the process logger writing to stderr.
pub fn build(level: &str, format: LogFormat) -> Result<Dispatch, Error> {
    let max_level = parse_level(level)?;
    let builder = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr);

    Ok(match format {
        LogFormat::Text => Dispatch::new(builder.finish()),
        LogFormat::Json => Dispatch::new(builder.json().finish()),
    })
}
