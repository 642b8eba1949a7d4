//! Server configuration.
//!
//! Read from a TOML file; every key is optional:
//!
//! ```toml
//! address            = "127.0.0.1:8080"
//! log_level          = "info"     # trace | debug | info | warn | error
//! log_format         = "text"     # text | json
//! request_timeout_ms = 30000      # 0 disables the deadline
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;
use crate::logger::LogFormat;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `host:port` to listen on. `":8080"` listens on every interface.
    pub address: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_owned(),
            log_level: "info".to_owned(),
            log_format: LogFormat::Text,
            request_timeout_ms: 30_000,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| Error::Config { path: path.to_owned(), source })
    }

    /// The per-request deadline, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}
