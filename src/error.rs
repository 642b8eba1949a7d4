//! Unified error type.

use std::path::PathBuf;

/// The error type returned by backdrop's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup and infrastructure failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a valid log level: `{0}`")]
    LogLevel(String),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
